use routekit_core::config::PaginationConfig;
use crate::query::is_reserved;
use routekit_core::SchemaMismatchError;
use routekit_data::{ConstraintMessageMap, Model};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        }
    }

    pub fn is_ascending(self) -> bool {
        self == OrderDirection::Asc
    }
}

impl FromStr for OrderDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(OrderDirection::Asc),
            "desc" => Ok(OrderDirection::Desc),
            other => Err(format!("unknown order direction '{other}'")),
        }
    }
}

/// Per-endpoint configuration layered on a [`Model`].
///
/// Every field name is checked against the model when the metadata is
/// built, so a typo fails at startup instead of on the first request.
#[derive(Debug, Clone)]
pub struct EndpointMeta {
    model: Arc<Model>,
    filter_fields: Vec<String>,
    search_fields: Vec<String>,
    order_by_fields: Vec<String>,
    default_order_by: Option<String>,
    default_order_direction: OrderDirection,
    path_parameters: Option<Vec<String>>,
    constraints_messages: ConstraintMessageMap,
    include_primary_keys_on_create: bool,
    pagination: PaginationConfig,
}

impl EndpointMeta {
    pub fn builder(model: impl Into<Arc<Model>>) -> EndpointMetaBuilder {
        EndpointMetaBuilder {
            model: model.into(),
            filter_fields: Vec::new(),
            search_fields: Vec::new(),
            order_by_fields: Vec::new(),
            default_order_by: None,
            default_order_direction: OrderDirection::Asc,
            path_parameters: None,
            constraints_messages: ConstraintMessageMap::new(),
            include_primary_keys_on_create: false,
            pagination: PaginationConfig::default(),
        }
    }

    /// Metadata with nothing filterable, searchable or sortable.
    pub fn new(model: impl Into<Arc<Model>>) -> Self {
        Self::builder(model).finish()
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn filter_fields(&self) -> &[String] {
        &self.filter_fields
    }

    pub fn search_fields(&self) -> &[String] {
        &self.search_fields
    }

    pub fn order_by_fields(&self) -> &[String] {
        &self.order_by_fields
    }

    pub fn default_order_by(&self) -> Option<&str> {
        self.default_order_by.as_deref()
    }

    pub fn default_order_direction(&self) -> OrderDirection {
        self.default_order_direction
    }

    /// Explicit URL parameter names carrying the primary keys, in key order.
    pub fn path_parameters(&self) -> Option<&[String]> {
        self.path_parameters.as_deref()
    }

    pub fn constraints_messages(&self) -> &ConstraintMessageMap {
        &self.constraints_messages
    }

    pub fn include_primary_keys_on_create(&self) -> bool {
        self.include_primary_keys_on_create
    }

    pub fn pagination(&self) -> PaginationConfig {
        self.pagination
    }
}

pub struct EndpointMetaBuilder {
    model: Arc<Model>,
    filter_fields: Vec<String>,
    search_fields: Vec<String>,
    order_by_fields: Vec<String>,
    default_order_by: Option<String>,
    default_order_direction: OrderDirection,
    path_parameters: Option<Vec<String>>,
    constraints_messages: ConstraintMessageMap,
    include_primary_keys_on_create: bool,
    pagination: PaginationConfig,
}

fn owned(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

impl EndpointMetaBuilder {
    /// Fields accepted as exact-match query filters (ANDed).
    pub fn filter_fields(mut self, fields: &[&str]) -> Self {
        self.filter_fields = owned(fields);
        self
    }

    /// Fields matched by the `search` term (ORed substring matches).
    pub fn search_fields(mut self, fields: &[&str]) -> Self {
        self.search_fields = owned(fields);
        self
    }

    pub fn order_by_fields(mut self, fields: &[&str]) -> Self {
        self.order_by_fields = owned(fields);
        self
    }

    pub fn default_order_by(mut self, field: &str, direction: OrderDirection) -> Self {
        self.default_order_by = Some(field.to_string());
        self.default_order_direction = direction;
        self
    }

    pub fn path_parameters(mut self, names: &[&str]) -> Self {
        self.path_parameters = Some(owned(names));
        self
    }

    pub fn constraints_messages(mut self, map: ConstraintMessageMap) -> Self {
        self.constraints_messages = map;
        self
    }

    pub fn include_primary_keys_on_create(mut self, include: bool) -> Self {
        self.include_primary_keys_on_create = include;
        self
    }

    pub fn pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn build(self) -> Result<EndpointMeta, SchemaMismatchError> {
        let model = &self.model;
        let named = self
            .filter_fields
            .iter()
            .chain(&self.search_fields)
            .chain(&self.order_by_fields)
            .chain(&self.default_order_by);
        for field in named {
            if !model.has_field(field) {
                return Err(SchemaMismatchError::UnknownField {
                    field: field.clone(),
                    model: model.name().to_string(),
                });
            }
        }
        if let Some(reserved) = self.filter_fields.iter().find(|f| is_reserved(f)) {
            return Err(SchemaMismatchError::Invalid(format!(
                "filter field '{reserved}' of '{}' clashes with a reserved list query parameter",
                model.name()
            )));
        }
        if let Some(ref default) = self.default_order_by {
            if !self.order_by_fields.is_empty() && !self.order_by_fields.contains(default) {
                return Err(SchemaMismatchError::Invalid(format!(
                    "default_order_by '{default}' is not one of the order_by_fields of '{}'",
                    model.name()
                )));
            }
        }
        let p = self.pagination;
        if p.default_per_page < 1 || p.default_per_page > p.max_per_page {
            return Err(SchemaMismatchError::Invalid(format!(
                "pagination default_per_page {} must be between 1 and max_per_page {}",
                p.default_per_page, p.max_per_page
            )));
        }
        Ok(self.finish())
    }

    fn finish(self) -> EndpointMeta {
        EndpointMeta {
            model: self.model,
            filter_fields: self.filter_fields,
            search_fields: self.search_fields,
            order_by_fields: self.order_by_fields,
            default_order_by: self.default_order_by,
            default_order_direction: self.default_order_direction,
            path_parameters: self.path_parameters,
            constraints_messages: self.constraints_messages,
            include_primary_keys_on_create: self.include_primary_keys_on_create,
            pagination: self.pagination,
        }
    }
}
