use std::env;

pub const DEFAULT_MAX_DEPTH: usize = 1_000_000;

/// Execution settings taken from `BE_MAX_DEPTH` and `BE_DUMP_IR`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecConfig {
    /// Most user-function frames that may be active at once. `None` is
    /// unlimited.
    pub max_depth: Option<usize>,
    pub dump_ir: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
            dump_ir: false,
        }
    }
}

impl ExecConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let max_depth = match lookup("BE_MAX_DEPTH")
            .map(|raw| raw.trim().replace('_', ""))
            .filter(|raw| !raw.is_empty())
        {
            None => Some(DEFAULT_MAX_DEPTH),
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) => None,
                Ok(limit) => Some(limit),
                Err(_) => {
                    log::warn!(
                        "ignoring BE_MAX_DEPTH={raw}; using the default of {DEFAULT_MAX_DEPTH}"
                    );
                    Some(DEFAULT_MAX_DEPTH)
                }
            },
        };
        let dump_ir = lookup("BE_DUMP_IR")
            .map(|raw| {
                let raw = raw.trim();
                !raw.is_empty() && raw != "0"
            })
            .unwrap_or(false);
        Self { max_depth, dump_ir }
    }
}
