//! List request to storage query derivation.

use crate::meta::{EndpointMeta, OrderDirection};
use routekit_core::error::{FieldError, Violation};
use routekit_core::schema::{FieldSchema, FieldType};
use routekit_core::{ParamDef, ValidatedRequest, ValidationError};
use routekit_data::{Condition, Dialect, Pagination, QueryBuilder};
use serde_json::Value;

pub const PAGE: &str = "page";
pub const PER_PAGE: &str = "per_page";
pub const SEARCH: &str = "search";
pub const ORDER_BY: &str = "order_by";
pub const ORDER_BY_DIRECTION: &str = "order_by_direction";

/// Everything a List request asks of storage.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    /// Exact-match predicates, ANDed. Path scope filters come first.
    pub filters: Vec<(String, Value)>,
    pub search: Option<String>,
    pub search_fields: Vec<String>,
    pub order_by: Option<(String, OrderDirection)>,
    pub pagination: Pagination,
}

impl QuerySpec {
    /// Derive the spec from a validated List request.
    ///
    /// Any field outside the configured filter / search / sort sets is a
    /// validation error.
    pub fn from_request(
        meta: &EndpointMeta,
        req: &ValidatedRequest,
        scope: Vec<(String, Value)>,
    ) -> Result<Self, ValidationError> {
        let query = req.query();
        let mut errors = Vec::new();
        let limits = meta.pagination();

        let page = query.get(PAGE).and_then(Value::as_u64).unwrap_or(1);
        let per_page = query
            .get(PER_PAGE)
            .and_then(Value::as_u64)
            .unwrap_or(limits.default_per_page);
        if page < 1 {
            errors.push(query_error(PAGE, Violation::TooSmall { min: 1.0 }));
        }
        if per_page < 1 || per_page > limits.max_per_page {
            errors.push(query_error(
                PER_PAGE,
                Violation::TooLarge {
                    max: limits.max_per_page as f64,
                },
            ));
        } else if Pagination::new(page, per_page).checked_offset().is_none() {
            errors.push(query_error(
                PAGE,
                Violation::TooLarge {
                    max: Pagination::max_page(per_page) as f64,
                },
            ));
        }

        let mut filters = scope;
        for (key, value) in query {
            if is_reserved(key) {
                continue;
            }
            if meta.filter_fields().iter().any(|f| f == key) {
                filters.push((key.clone(), value.clone()));
            } else {
                errors.push(query_error(key, Violation::UnknownField));
            }
        }

        let search = match query.get(SEARCH).and_then(Value::as_str) {
            Some(_) if meta.search_fields().is_empty() => {
                errors.push(query_error(SEARCH, Violation::UnknownField));
                None
            }
            Some(term) => Some(term.trim().to_string()).filter(|t| !t.is_empty()),
            None => None,
        };

        let direction = match query.get(ORDER_BY_DIRECTION).and_then(Value::as_str) {
            Some(d) => match d.parse::<OrderDirection>() {
                Ok(d) => Some(d),
                Err(_) => {
                    errors.push(query_error(
                        ORDER_BY_DIRECTION,
                        Violation::InvalidEnum {
                            allowed: vec!["asc".into(), "desc".into()],
                        },
                    ));
                    None
                }
            },
            None => None,
        };
        let order_by = match query.get(ORDER_BY).and_then(Value::as_str) {
            Some(field) if meta.order_by_fields().iter().any(|f| f == field) => Some((
                field.to_string(),
                direction.unwrap_or_default(),
            )),
            Some(_) => {
                errors.push(query_error(
                    ORDER_BY,
                    Violation::InvalidEnum {
                        allowed: meta.order_by_fields().to_vec(),
                    },
                ));
                None
            }
            None => meta
                .default_order_by()
                .map(|f| (f.to_string(), direction.unwrap_or(meta.default_order_direction()))),
        };

        if !errors.is_empty() {
            return Err(ValidationError::new(errors));
        }
        Ok(Self {
            filters,
            search,
            search_fields: meta.search_fields().to_vec(),
            order_by,
            pagination: Pagination::new(page, per_page),
        })
    }

    /// Builder carrying the shared predicate and the sort, without paging.
    /// Use [`build_count`](QueryBuilder::build_count) on it for the total.
    pub fn query_builder(&self, table: &str, dialect: Dialect) -> QueryBuilder {
        let mut qb = QueryBuilder::new_with_dialect(table, dialect);
        for (field, value) in &self.filters {
            qb = qb.where_eq(field, value.clone());
        }
        if let Some(ref term) = self.search {
            qb = qb.where_any(
                self.search_fields
                    .iter()
                    .map(|f| Condition::contains(f, term))
                    .collect(),
            );
        }
        if let Some((ref field, direction)) = self.order_by {
            qb = qb.order_by(field, direction.is_ascending());
        }
        qb
    }

    /// The same builder with `LIMIT`/`OFFSET` for the requested page.
    pub fn page_builder(&self, table: &str, dialect: Dialect) -> QueryBuilder {
        self.query_builder(table, dialect)
            .limit(self.pagination.per_page)
            .offset(self.pagination.offset())
    }
}

pub(crate) fn is_reserved(key: &str) -> bool {
    matches!(key, PAGE | PER_PAGE | SEARCH | ORDER_BY | ORDER_BY_DIRECTION)
}

fn query_error(key: &str, violation: Violation) -> FieldError {
    FieldError::new(vec!["query".to_string(), key.to_string()], violation)
}

/// Query parameters a List endpoint declares for `meta`.
pub fn list_params(meta: &EndpointMeta) -> Vec<ParamDef> {
    let limits = meta.pagination();
    let mut params = vec![
        ParamDef::query(
            PAGE,
            FieldSchema::integer()
                .minimum(1.0)
                .default_value(Value::from(1u64))
                .description("Page number, starting at 1"),
        ),
        ParamDef::query(
            PER_PAGE,
            FieldSchema::integer()
                .minimum(1.0)
                .maximum(limits.max_per_page as f64)
                .default_value(Value::from(limits.default_per_page))
                .description("Number of results per page"),
        ),
    ];
    if !meta.search_fields().is_empty() {
        params.push(ParamDef::query(
            SEARCH,
            FieldSchema::string()
                .optional()
                .description(format!("Search in {}", meta.search_fields().join(", "))),
        ));
    }
    if !meta.order_by_fields().is_empty() {
        params.push(ParamDef::query(
            ORDER_BY,
            FieldSchema::enumeration(meta.order_by_fields().iter().cloned()).optional(),
        ));
    }
    if !meta.order_by_fields().is_empty() || meta.default_order_by().is_some() {
        params.push(ParamDef::query(
            ORDER_BY_DIRECTION,
            FieldSchema::new(FieldType::Enum(vec!["asc".into(), "desc".into()])).optional(),
        ));
    }
    for field in meta.filter_fields() {
        if let Some(mut schema) = meta.model().param_schema(field) {
            schema.required = false;
            params.push(ParamDef::query(field.clone(), schema));
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use routekit_core::http::Method;
    use routekit_core::{RawRequest, RouteContract};
    use routekit_data::Model;
    use serde_json::json;

    fn meta() -> EndpointMeta {
        let model = Model::builder("User")
            .field("id", FieldSchema::integer())
            .field("email", FieldSchema::email())
            .field("username", FieldSchema::string())
            .primary_key("id")
            .build()
            .unwrap();
        EndpointMeta::builder(model)
            .filter_fields(&["email"])
            .search_fields(&["username"])
            .order_by_fields(&["id", "username"])
            .default_order_by("id", OrderDirection::Desc)
            .build()
            .unwrap()
    }

    fn spec_for(target: &str) -> Result<QuerySpec, ValidationError> {
        let meta = meta();
        let contract = RouteContract::builder()
            .params(list_params(&meta))
            .strict_query()
            .build()
            .unwrap();
        let req = contract.validate(&RawRequest::new(Method::GET, target))?;
        QuerySpec::from_request(&meta, &req, Vec::new())
    }

    #[test]
    fn filter_and_search_predicate() {
        let spec = spec_for("/users?email=a@b.com&search=jo").unwrap();
        let qb = spec.query_builder("users", Dialect::Sqlite);
        let count = qb.build_count().unwrap();
        let select = spec.page_builder("users", Dialect::Sqlite).build_select(&["*"]).unwrap();

        let predicate = "WHERE \"email\" = ? AND (\"username\" LIKE ? ESCAPE '\\')";
        assert!(select.sql.contains(predicate), "{}", select.sql);
        assert!(count.sql.ends_with(predicate), "{}", count.sql);
        assert_eq!(select.params, vec![json!("a@b.com"), json!("%jo%")]);
        assert_eq!(count.params, select.params);
        assert!(select.sql.ends_with("ORDER BY \"id\" DESC LIMIT 20 OFFSET 0"));
    }

    #[test]
    fn requested_order_and_page() {
        let spec = spec_for("/users?order_by=username&order_by_direction=asc&page=3&per_page=5")
            .unwrap();
        assert_eq!(spec.order_by, Some(("username".into(), OrderDirection::Asc)));
        assert_eq!(spec.pagination, Pagination::new(3, 5));
        assert_eq!(spec.pagination.offset(), 10);
    }

    #[test]
    fn unknown_fields_never_reach_storage() {
        let err = spec_for("/users?username=jo").unwrap_err();
        assert_eq!(
            err.find("query.username").unwrap().violation,
            Violation::UnknownField
        );
        let err = spec_for("/users?order_by=email").unwrap_err();
        assert!(err.find("query.order_by").is_some());
        let err = spec_for("/users?per_page=1000").unwrap_err();
        assert!(err.find("query.per_page").is_some());
    }

    #[test]
    fn page_beyond_the_addressable_offset_is_rejected() {
        let err = spec_for("/users?page=9223372036854775807&per_page=10").unwrap_err();
        assert_eq!(
            err.find("query.page").unwrap().violation,
            Violation::TooLarge {
                max: Pagination::max_page(10) as f64
            }
        );
        let last = Pagination::max_page(10);
        let spec = spec_for(&format!("/users?page={last}&per_page=10")).unwrap();
        assert!(spec.pagination.checked_offset().is_some());
    }

    #[test]
    fn blank_search_is_ignored() {
        let spec = spec_for("/users?search=%20%20").unwrap();
        assert_eq!(spec.search, None);
        assert!(spec.filters.is_empty());
    }
}
