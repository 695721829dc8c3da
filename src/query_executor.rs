use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use graphql_parser::query::{
    Definition, Document, Field, OperationDefinition, Selection, SelectionSet, Value as AstValue,
    parse_query,
};
use serde_json::{Map, Value, json};

use crate::error::GatewayError;
use crate::field_resolver::{
    LaunchResolver, LaunchpadResolver, LookupMode, Resolved, classify, reference_key,
};
use crate::schema_registry::SchemaRegistry;
use crate::{GraphQLRequest, RequestContext};

const HEALTHCHECK_STATUS: &str = "all systems go";

/// Parses an incoming query document, validates it against the registry, and
/// drives field resolution: top-level fields fan out concurrently, and each
/// resolved record is projected through its selection set. Store failures
/// stay local to the field that hit them, reported as `{message, path}`
/// entries; parse and validation failures fail the whole request.
pub struct QueryExecutor;

impl QueryExecutor {
    pub fn new() -> Self {
        QueryExecutor
    }

    pub async fn execute(
        &self,
        request: &GraphQLRequest,
        registry: &SchemaRegistry,
        ctx: &RequestContext,
    ) -> Result<Value, GatewayError> {
        let document = parse_query::<String>(&request.query)
            .map_err(|err| GatewayError::QueryParse(err.to_string()))?;
        let selection_set = select_operation(&document, request.operation_name.as_deref())?;
        let variables = request.variables.clone().unwrap_or(Value::Null);

        validate_selection_set(registry, "Query", &selection_set.items)?;

        let mut futures = Vec::new();
        for selection in &selection_set.items {
            if let Selection::Field(field) = selection {
                futures.push(self.resolve_root(field, registry, ctx, &variables));
            }
        }
        let outcomes = join_all(futures).await;

        let mut data = Map::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            let (key, value, mut field_errors) = outcome?;
            data.insert(key, value);
            errors.append(&mut field_errors);
        }

        let mut response = Map::new();
        response.insert("data".to_string(), Value::Object(data));
        if !errors.is_empty() {
            response.insert("errors".to_string(), Value::Array(errors));
        }
        Ok(Value::Object(response))
    }

    async fn resolve_root(
        &self,
        field: &Field<'_, String>,
        registry: &SchemaRegistry,
        ctx: &RequestContext,
        variables: &Value,
    ) -> Result<(String, Value, Vec<Value>), GatewayError> {
        let key = response_key(field);
        if field.name == "__typename" {
            return Ok((key, json!("Query"), Vec::new()));
        }
        // The one schema field with no backing-store dependency.
        if field.name == "healthcheck" {
            return Ok((key, json!(HEALTHCHECK_STATUS), Vec::new()));
        }

        let info =
            registry
                .field("Query", &field.name)
                .ok_or_else(|| GatewayError::UnknownField {
                    type_name: "Query".to_string(),
                    field: field.name.clone(),
                })?;
        let id = id_argument(field, variables)?;
        // Top-level invocations have no parent context by construction.
        let mode = classify(None, None, id);
        let path = vec![json!(key.clone())];

        let (value, errors) = self
            .resolve_and_project(
                &info.type_name,
                mode,
                &field.selection_set.items,
                path,
                registry,
                ctx,
                variables,
            )
            .await;
        Ok((key, value, errors))
    }

    /// Dispatch one lookup and project the outcome through `selections`.
    /// Boxed because projection of object sub-fields recurses back into it.
    #[allow(clippy::too_many_arguments)]
    fn resolve_and_project<'a, 'doc>(
        &'a self,
        target_type: &'a str,
        mode: Option<LookupMode>,
        selections: &'a [Selection<'doc, String>],
        path: Vec<Value>,
        registry: &'a SchemaRegistry,
        ctx: &'a RequestContext,
        variables: &'a Value,
    ) -> BoxFuture<'a, (Value, Vec<Value>)> {
        async move {
            // No mode means the parent carried an empty reference: the field
            // is null and nothing is fetched.
            let mode = match mode {
                Some(mode) => mode,
                None => return (Value::Null, Vec::new()),
            };

            let resolved = match target_type {
                "Launch" => LaunchResolver::resolve(mode, ctx).await,
                "Launchpad" => LaunchpadResolver::resolve(mode, ctx).await,
                other => {
                    return (
                        Value::Null,
                        vec![error_entry(format!("no resolver for type \"{other}\""), &path)],
                    );
                }
            };

            match resolved {
                Err(err) => (Value::Null, vec![error_entry(err.to_string(), &path)]),
                Ok(Resolved::Unit(None)) => (Value::Null, Vec::new()),
                Ok(Resolved::Unit(Some(record))) => {
                    self.project_record(target_type, &record, selections, path, registry, ctx, variables)
                        .await
                }
                Ok(Resolved::Seq(records)) => {
                    let futures = records.iter().enumerate().map(|(index, record)| {
                        let mut item_path = path.clone();
                        item_path.push(json!(index));
                        async move {
                            if record.is_null() {
                                (Value::Null, Vec::new())
                            } else {
                                self.project_record(
                                    target_type, record, selections, item_path, registry, ctx,
                                    variables,
                                )
                                .await
                            }
                        }
                    });
                    let projected = join_all(futures).await;

                    let mut values = Vec::with_capacity(projected.len());
                    let mut errors = Vec::new();
                    for (value, mut item_errors) in projected {
                        values.push(value);
                        errors.append(&mut item_errors);
                    }
                    (Value::Array(values), errors)
                }
            }
        }
        .boxed()
    }

    /// Project one record through a selection set: scalars copy off the
    /// record's JSON, object fields classify against the record and dispatch.
    /// Sibling fields resolve concurrently.
    #[allow(clippy::too_many_arguments)]
    async fn project_record<'a, 'doc>(
        &'a self,
        type_name: &'a str,
        record: &'a Value,
        selections: &'a [Selection<'doc, String>],
        path: Vec<Value>,
        registry: &'a SchemaRegistry,
        ctx: &'a RequestContext,
        variables: &'a Value,
    ) -> (Value, Vec<Value>) {
        let futures = selections
            .iter()
            .filter_map(|selection| match selection {
                Selection::Field(field) => Some(field),
                _ => None,
            })
            .map(|field| {
                let mut field_path = path.clone();
                let key = response_key(field);
                field_path.push(json!(key.clone()));
                async move {
                    if field.name == "__typename" {
                        return (key, json!(type_name), Vec::new());
                    }
                    let info = match registry.field(type_name, &field.name) {
                        Some(info) => info,
                        None => {
                            let message = format!(
                                "cannot query field \"{}\" on type \"{type_name}\"",
                                field.name
                            );
                            return (key, Value::Null, vec![error_entry(message, &field_path)]);
                        }
                    };

                    if registry.is_object_type(&info.type_name) {
                        let id = match id_argument(field, variables) {
                            Ok(id) => id,
                            Err(err) => {
                                return (
                                    key,
                                    Value::Null,
                                    vec![error_entry(err.to_string(), &field_path)],
                                );
                            }
                        };
                        let mode = classify(
                            Some(record),
                            reference_key(type_name, &field.name),
                            id,
                        );
                        let (value, errors) = self
                            .resolve_and_project(
                                &info.type_name,
                                mode,
                                &field.selection_set.items,
                                field_path,
                                registry,
                                ctx,
                                variables,
                            )
                            .await;
                        (key, value, errors)
                    } else {
                        let value = record.get(field.name.as_str()).cloned().unwrap_or(Value::Null);
                        (key, value, Vec::new())
                    }
                }
            });
        let resolved = join_all(futures).await;

        let mut object = Map::new();
        let mut errors = Vec::new();
        for (key, value, mut field_errors) in resolved {
            object.insert(key, value);
            errors.append(&mut field_errors);
        }
        (Value::Object(object), errors)
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        QueryExecutor::new()
    }
}

fn select_operation<'a, 'doc>(
    document: &'a Document<'doc, String>,
    name: Option<&str>,
) -> Result<&'a SelectionSet<'doc, String>, GatewayError> {
    let mut fallback = None;
    let mut unsupported = None;

    for definition in &document.definitions {
        match definition {
            Definition::Operation(OperationDefinition::Query(query)) => {
                if let Some(wanted) = name {
                    if query.name.as_deref() == Some(wanted) {
                        return Ok(&query.selection_set);
                    }
                } else if fallback.is_none() {
                    fallback = Some(&query.selection_set);
                }
            }
            Definition::Operation(OperationDefinition::SelectionSet(set)) => {
                if name.is_none() && fallback.is_none() {
                    fallback = Some(set);
                }
            }
            Definition::Operation(OperationDefinition::Mutation(_)) => {
                unsupported = Some("mutation");
            }
            Definition::Operation(OperationDefinition::Subscription(_)) => {
                unsupported = Some("subscription");
            }
            Definition::Fragment(_) => {}
        }
    }

    match (fallback, name) {
        (Some(set), None) => Ok(set),
        (_, Some(wanted)) => Err(GatewayError::UnknownOperation(wanted.to_string())),
        (None, None) => match unsupported {
            Some(kind) => Err(GatewayError::UnsupportedOperation(kind)),
            None => Err(GatewayError::QueryParse(
                "document contains no query operation".to_string(),
            )),
        },
    }
}

fn validate_selection_set(
    registry: &SchemaRegistry,
    type_name: &str,
    items: &[Selection<'_, String>],
) -> Result<(), GatewayError> {
    for selection in items {
        if let Selection::Field(field) = selection {
            if field.name == "__typename" {
                continue;
            }
            let info =
                registry
                    .field(type_name, &field.name)
                    .ok_or_else(|| GatewayError::UnknownField {
                        type_name: type_name.to_string(),
                        field: field.name.clone(),
                    })?;
            if registry.is_object_type(&info.type_name) {
                if field.selection_set.items.is_empty() {
                    return Err(GatewayError::MissingSelection {
                        type_name: type_name.to_string(),
                        field: field.name.clone(),
                    });
                }
                validate_selection_set(registry, &info.type_name, &field.selection_set.items)?;
            }
        }
    }
    Ok(())
}

fn id_argument(
    field: &Field<'_, String>,
    variables: &Value,
) -> Result<Option<String>, GatewayError> {
    for (name, value) in &field.arguments {
        if name != "id" {
            continue;
        }
        return match value {
            AstValue::String(id) => Ok(Some(id.clone())),
            AstValue::Variable(var) => match variables.get(var.as_str()).and_then(Value::as_str) {
                Some(id) => Ok(Some(id.to_string())),
                None => Err(GatewayError::UndefinedVariable(var.clone())),
            },
            AstValue::Null => Ok(None),
            other => Err(GatewayError::BadArgument(format!(
                "id must be a string, got {other:?}"
            ))),
        };
    }
    Ok(None)
}

fn response_key(field: &Field<'_, String>) -> String {
    field.alias.clone().unwrap_or_else(|| field.name.clone())
}

fn error_entry(message: String, path: &[Value]) -> Value {
    json!({ "message": message, "path": path })
}
