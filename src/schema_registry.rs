use std::collections::HashMap;

use graphql_parser::schema::{Definition, Type, TypeDefinition, parse_schema};

use crate::error::GatewayError;

#[derive(Clone, Debug)]
pub struct FieldInfo {
    /// Base named type with list/non-null wrappers stripped.
    pub type_name: String,
    pub is_list: bool,
}

/// Field lookup table built from the SDL at startup. The executor consults it
/// to validate selections and to tell object fields (which dispatch to a
/// resolver) from scalar fields (which project straight off the record).
pub struct SchemaRegistry {
    types: HashMap<String, HashMap<String, FieldInfo>>,
}

impl SchemaRegistry {
    pub fn from_sdl(sdl: &str) -> Result<Self, GatewayError> {
        let document =
            parse_schema::<String>(sdl).map_err(|err| GatewayError::Schema(err.to_string()))?;

        let mut types = HashMap::new();
        for definition in &document.definitions {
            if let Definition::TypeDefinition(TypeDefinition::Object(object)) = definition {
                let mut fields = HashMap::new();
                for field in &object.fields {
                    fields.insert(
                        field.name.clone(),
                        FieldInfo {
                            type_name: base_type(&field.field_type).to_string(),
                            is_list: is_list(&field.field_type),
                        },
                    );
                }
                types.insert(object.name.clone(), fields);
            }
        }
        Ok(SchemaRegistry { types })
    }

    pub fn field(&self, type_name: &str, field: &str) -> Option<&FieldInfo> {
        self.types.get(type_name).and_then(|fields| fields.get(field))
    }

    pub fn is_object_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }
}

fn base_type<'a, 'b>(ty: &'b Type<'a, String>) -> &'b str {
    match ty {
        Type::NamedType(name) => name.as_str(),
        Type::ListType(inner) | Type::NonNullType(inner) => base_type(inner),
    }
}

fn is_list(ty: &Type<'_, String>) -> bool {
    match ty {
        Type::NamedType(_) => false,
        Type::ListType(_) => true,
        Type::NonNullType(inner) => is_list(inner),
    }
}
