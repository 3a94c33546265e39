//! Locale-aware string collation for name comparison
//!
//! Tags are BCP-47 (`en-US`, `sv-SE`). POSIX names from the environment
//! (`sv_SE.UTF-8`) are normalized to the same form. The `C` and `POSIX`
//! locales compare by code point; every other tag is backed by the CLDR
//! collation tables for that locale.

use icu_collator::{Collator as IcuCollator, CollatorOptions};
use icu_locid::Locale;
use log::{trace, warn};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;

/// Locale taken from the environment, used when no tag is configured
static ENV_LOCALE: OnceLock<String> = OnceLock::new();

thread_local! {
    /// Collation tables already loaded on this thread, by tag
    static LOADED: RefCell<HashMap<String, Rc<IcuCollator>>> = RefCell::new(HashMap::new());
}

/// Locale name from `LC_ALL`, `LC_COLLATE` or `LANG`
pub fn env_locale() -> &'static str {
    ENV_LOCALE.get_or_init(|| {
        env::var("LC_ALL")
            .or_else(|_| env::var("LC_COLLATE"))
            .or_else(|_| env::var("LANG"))
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "en-US".to_string())
    })
}

/// `sv_SE.UTF-8@euro` -> `sv-SE`
fn normalize_tag(locale: &str) -> String {
    locale
        .split(['.', '@'])
        .next()
        .unwrap_or(locale)
        .replace('_', "-")
}

fn is_posix(tag: &str) -> bool {
    tag == "C" || tag == "POSIX"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollationKind {
    /// Plain code point order
    CodePoint,
    /// CLDR collation for the locale
    Cldr,
}

/// Collation tables for `tag`, or the root tables when the tag does not
/// parse or has no data
fn load(tag: &str) -> Option<Rc<IcuCollator>> {
    LOADED.with(|loaded| {
        if let Some(collator) = loaded.borrow().get(tag) {
            return Some(Rc::clone(collator));
        }
        let collator = Rc::new(build(tag)?);
        loaded.borrow_mut().insert(tag.to_string(), Rc::clone(&collator));
        Some(collator)
    })
}

fn build(tag: &str) -> Option<IcuCollator> {
    let locale = match tag.parse::<Locale>() {
        Ok(locale) => locale,
        Err(e) => {
            warn!("invalid locale '{}': {}; using root collation", tag, e);
            Locale::UND
        }
    };
    trace!("loading collation for {}", locale);
    IcuCollator::try_new(&locale.into(), CollatorOptions::new())
        .or_else(|e| {
            warn!("no collation data for '{}': {}; using root collation", tag, e);
            IcuCollator::try_new(&Locale::UND.into(), CollatorOptions::new())
        })
        .map_err(|e| warn!("root collation unavailable: {}; comparing code points", e))
        .ok()
}

/// String comparator bound to a locale tag
#[derive(Clone)]
pub struct Collator {
    locale: String,
    inner: Option<Rc<IcuCollator>>,
}

impl Collator {
    pub fn new(locale: &str) -> Self {
        let tag = normalize_tag(locale);
        let inner = if is_posix(&tag) { None } else { load(&tag) };
        Self {
            locale: locale.to_string(),
            inner,
        }
    }

    /// First configured tag wins; an empty list falls back to the environment
    pub fn for_locales(locales: &[String]) -> Self {
        match locales.first() {
            Some(locale) => Self::new(locale),
            None => Self::new(env_locale()),
        }
    }

    pub fn locale_name(&self) -> &str {
        &self.locale
    }

    pub fn kind(&self) -> CollationKind {
        match self.inner {
            Some(_) => CollationKind::Cldr,
            None => CollationKind::CodePoint,
        }
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        match &self.inner {
            Some(collator) => collator.compare(a, b).then_with(|| a.cmp(b)),
            None => a.cmp(b),
        }
    }
}

impl fmt::Debug for Collator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collator")
            .field("locale", &self.locale)
            .field("kind", &self.kind())
            .finish()
    }
}

impl PartialEq for Collator {
    fn eq(&self, other: &Self) -> bool {
        self.locale == other.locale
    }
}

impl Eq for Collator {}

impl Default for Collator {
    fn default() -> Self {
        Self::new("en-US")
    }
}
