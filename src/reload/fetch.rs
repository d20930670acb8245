//! Typed point queries against a script source.

use crate::core::ConfigValue;
use crate::sources::{Resolution, ScriptSource};
use tracing::{error, trace};

/// Fetch `key` from `source` as a `T`.
///
/// Returns `None` when the key is absent or holds a value of the wrong kind.
/// A missing top-level name is expected while config files are still being
/// filled in, so it is only traced; every other failure is logged once per
/// declaration site.
pub(crate) fn fetch<T: ConfigValue>(
    source: &dyn ScriptSource,
    key: &str,
    sites: &[String],
) -> Option<T> {
    match source.resolve(key) {
        Resolution::Found(value) => match T::from_script(&value) {
            Ok(v) => Some(v),
            Err(reason) => {
                report(key, sites, &format!("Expected {}: {}", T::KIND, reason));
                None
            }
        },
        Resolution::TopLevelUndefined => {
            trace!(key = %key, source = %source.name(), "Key not defined yet");
            None
        }
        Resolution::Undefined { segment } => {
            report(key, sites, &format!("{} is not defined", segment));
            None
        }
    }
}

fn report(key: &str, sites: &[String], reason: &str) {
    for site in sites {
        error!(key = %key, site = %site, "{}: Can't get [{}]. {}", site, key, reason);
    }
}
