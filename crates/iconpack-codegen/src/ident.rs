use crate::types::Identifier;
use crate::CodegenError;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::warn;

const ASSET_EXTENSION: &str = ".svg";

/// A run of separators, optionally followed by the character to capitalize.
static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_\s]+(.)?").expect("valid separator pattern"));

/// Strip every trailing `.svg` suffix (ASCII case-insensitive).
pub fn strip_extension(name: &str) -> &str {
    let mut stem = name;
    while let Some(split) = stem.len().checked_sub(ASSET_EXTENSION.len()) {
        match stem.get(split..) {
            Some(ext) if ext.eq_ignore_ascii_case(ASSET_EXTENSION) => stem = &stem[..split],
            _ => break,
        }
    }
    stem
}

/// Derive the PascalCase component identifier for an asset file name.
///
/// Separator runs (`-`, `_`, whitespace) are dropped and the character after
/// each run is upper-cased, then the first character is upper-cased. Every
/// other character passes through untouched, so the function is total.
///
/// Dropping separators can expose a new `.svg` suffix (`x.svg_`, `a.s-vg`),
/// so the pass repeats until its output is stable. Re-deriving an
/// identifier is therefore a no-op.
pub fn derive(name: &str) -> Identifier {
    let mut current = derive_once(name);
    loop {
        let next = derive_once(&current);
        if next == current {
            return Identifier::new(current);
        }
        current = next;
    }
}

fn derive_once(name: &str) -> String {
    let stem = strip_extension(name);
    let joined = SEPARATOR_RUN.replace_all(stem, |caps: &Captures<'_>| {
        caps.get(1)
            .map(|c| c.as_str().to_uppercase())
            .unwrap_or_default()
    });
    upper_first(&joined)
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether `s` can be used verbatim as a JavaScript binding and module name.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// What to do when two assets in one run derive the same identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Abort the run, naming both assets.
    #[default]
    Fail,
    /// Give the later asset the smallest free numeric suffix (`ArrowLeft2`).
    Suffix,
}

impl std::str::FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "suffix" => Ok(Self::Suffix),
            other => Err(format!(
                "unknown collision policy '{other}', expected 'fail' or 'suffix'"
            )),
        }
    }
}

/// Hands out run-unique identifiers in delivery order.
///
/// Uniqueness is checked case-insensitively: `ArrowLeft.tsx` and
/// `Arrowleft.tsx` would overwrite each other on a case-insensitive
/// filesystem, so they count as a collision.
#[derive(Debug, Default)]
pub struct IdentifierAllocator {
    policy: CollisionPolicy,
    /// Lower-cased identifier -> asset name that claimed it.
    taken: HashMap<String, String>,
}

impl IdentifierAllocator {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            taken: HashMap::new(),
        }
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    pub fn allocate(&mut self, asset_name: &str) -> Result<Identifier, CodegenError> {
        let derived = derive(asset_name);
        if !is_valid_identifier(&derived) {
            return Err(CodegenError::InvalidIdentifier {
                name: asset_name.to_owned(),
                derived: derived.into_inner(),
            });
        }

        let identifier = match self.taken.get(&derived.to_lowercase()) {
            None => derived,
            Some(existing) => match self.policy {
                CollisionPolicy::Fail => {
                    return Err(CodegenError::Collision {
                        identifier: derived.into_inner(),
                        name: asset_name.to_owned(),
                        existing: existing.clone(),
                    });
                }
                CollisionPolicy::Suffix => {
                    let suffixed = self.next_free(&derived);
                    warn!(
                        "identifier {derived} from '{asset_name}' already used by '{existing}', using {suffixed}"
                    );
                    suffixed
                }
            },
        };

        self.taken
            .insert(identifier.to_lowercase(), asset_name.to_owned());
        Ok(identifier)
    }

    fn next_free(&self, base: &Identifier) -> Identifier {
        let mut n = 2u32;
        loop {
            let candidate = format!("{base}{n}");
            if !self.taken.contains_key(&candidate.to_lowercase()) {
                return Identifier::new(candidate);
            }
            n += 1;
        }
    }
}
