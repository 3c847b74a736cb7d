//! Path-parameter resolution across nested route scopes.
//!
//! Every scope between the registry root and a route may declare path
//! parameters. [`PathParamAccumulator`] collects those declarations in
//! root-to-leaf order and [`merge_path_params`] folds them into the single
//! list that ends up in the route's contract.

use crate::error::SchemaMismatchError;
use crate::params::{ParamDef, ParamLocation};
use crate::schema::FieldSchema;

/// Rewrite `:name` segments to `{name}`, collapse duplicate slashes and
/// drop a trailing slash.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => s.to_string(),
        })
        .collect();
    format!("/{}", segments.join("/"))
}

pub fn join_paths(prefix: &str, path: &str) -> String {
    normalize_path(&format!("{prefix}/{path}"))
}

/// Parameter names appearing in a normalized path, in URL order.
pub fn template_params(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|s| s.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
        .map(String::from)
        .collect()
}

/// Merge per-level path-parameter declarations into one ordered list.
///
/// A name declared again at a deeper level takes that level's schema but
/// keeps the position of its first declaration. Non-path parameters are
/// ignored.
pub fn merge_path_params<'a, I>(levels: I) -> Vec<ParamDef>
where
    I: IntoIterator<Item = &'a [ParamDef]>,
{
    let mut merged: Vec<ParamDef> = Vec::new();
    for level in levels {
        for def in level.iter().filter(|d| d.location == ParamLocation::Path) {
            match merged.iter_mut().find(|m| m.name == def.name) {
                Some(existing) => existing.schema = def.schema.clone(),
                None => merged.push(def.clone()),
            }
        }
    }
    merged
}

/// Path-parameter declarations gathered while walking from the root scope
/// down to a route.
#[derive(Debug, Clone, Default)]
pub struct PathParamAccumulator {
    levels: Vec<Vec<ParamDef>>,
}

impl PathParamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: Vec<ParamDef>) {
        self.levels.push(level);
    }

    pub fn levels(&self) -> &[Vec<ParamDef>] {
        &self.levels
    }

    /// Resolve the effective path parameters of `path` (already normalized).
    ///
    /// Segments nobody declared become required strings. Declarations for
    /// names absent from the URL are refused.
    ///
    /// The result is in URL order. The implicit level is merged first, so
    /// scope declarations refine the type of a parameter but never move it.
    pub fn resolve(&self, path: &str) -> Result<Vec<ParamDef>, SchemaMismatchError> {
        let names = template_params(path);
        let implicit: Vec<ParamDef> = names
            .iter()
            .map(|n| ParamDef::path(n.clone(), FieldSchema::string()))
            .collect();

        let merged = merge_path_params(
            std::iter::once(implicit.as_slice()).chain(self.levels.iter().map(Vec::as_slice)),
        );

        if let Some(stray) = merged.iter().find(|p| !names.contains(&p.name)) {
            return Err(SchemaMismatchError::UnknownPathParameter {
                name: stray.name.clone(),
                path: path.to_string(),
            });
        }
        Ok(merged)
    }
}

/// Which URL parameter carries a given primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub key: String,
    pub param: String,
}

/// Pair each primary key with a resolved path parameter.
///
/// Without `explicit`, keys match parameters by name. With `explicit`, the
/// listed parameter names map positionally onto the keys and must all exist
/// in the URL.
pub fn bind_primary_keys(
    primary_keys: &[String],
    path_params: &[ParamDef],
    explicit: Option<&[String]>,
    path: &str,
) -> Result<Vec<KeyBinding>, SchemaMismatchError> {
    let has_param = |name: &str| path_params.iter().any(|p| p.name == name);

    match explicit {
        Some(names) => {
            if names.len() != primary_keys.len() {
                return Err(SchemaMismatchError::PathParameterCount {
                    expected: primary_keys.len(),
                    found: names.len(),
                    path: path.to_string(),
                });
            }
            primary_keys
                .iter()
                .zip(names)
                .map(|(key, param)| {
                    if has_param(param) {
                        Ok(KeyBinding {
                            key: key.clone(),
                            param: param.clone(),
                        })
                    } else {
                        Err(SchemaMismatchError::PrimaryKeyMismatch {
                            key: key.clone(),
                            path: path.to_string(),
                        })
                    }
                })
                .collect()
        }
        None => primary_keys
            .iter()
            .map(|key| {
                if has_param(key) {
                    Ok(KeyBinding {
                        key: key.clone(),
                        param: key.clone(),
                    })
                } else {
                    Err(SchemaMismatchError::PrimaryKeyMismatch {
                        key: key.clone(),
                        path: path.to_string(),
                    })
                }
            })
            .collect(),
    }
}
