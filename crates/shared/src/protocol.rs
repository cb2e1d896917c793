use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use crate::{
    domain::{Item, ItemId},
    error::{DecodeError, GraphqlError},
};

pub const LIST_TODOS: &str = r#"query ListTodos($filter: ModelTodoFilterInput, $limit: Int, $nextToken: String) {
  listTodos(filter: $filter, limit: $limit, nextToken: $nextToken) {
    items {
      id
      name
      description
      createdAt
      updatedAt
    }
    nextToken
  }
}"#;

pub const CREATE_TODO: &str = r#"mutation CreateTodo($input: CreateTodoInput!, $condition: ModelTodoConditionInput) {
  createTodo(input: $input, condition: $condition) {
    id
    name
    description
    createdAt
    updatedAt
  }
}"#;

pub const UPDATE_TODO: &str = r#"mutation UpdateTodo($input: UpdateTodoInput!, $condition: ModelTodoConditionInput) {
  updateTodo(input: $input, condition: $condition) {
    id
    name
    description
    createdAt
    updatedAt
  }
}"#;

pub const DELETE_TODO: &str = r#"mutation DeleteTodo($input: DeleteTodoInput!, $condition: ModelTodoConditionInput) {
  deleteTodo(input: $input, condition: $condition) {
    id
  }
}"#;

/// The four operations the todo API exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoRequest {
    List,
    Create { name: String },
    Update { id: ItemId, name: String },
    Delete { id: ItemId },
}

impl TodoRequest {
    pub fn operation_name(&self) -> &'static str {
        match self {
            TodoRequest::List => "ListTodos",
            TodoRequest::Create { .. } => "CreateTodo",
            TodoRequest::Update { .. } => "UpdateTodo",
            TodoRequest::Delete { .. } => "DeleteTodo",
        }
    }

    /// Name of the field under `data` that carries this operation's result.
    pub fn data_field(&self) -> &'static str {
        match self {
            TodoRequest::List => "listTodos",
            TodoRequest::Create { .. } => "createTodo",
            TodoRequest::Update { .. } => "updateTodo",
            TodoRequest::Delete { .. } => "deleteTodo",
        }
    }

    pub fn to_graphql(&self) -> GraphqlRequest {
        let (query, variables) = match self {
            TodoRequest::List => (LIST_TODOS, json!({})),
            TodoRequest::Create { name } => (CREATE_TODO, json!({ "input": { "name": name } })),
            TodoRequest::Update { id, name } => (
                UPDATE_TODO,
                json!({ "input": { "id": id, "name": name } }),
            ),
            TodoRequest::Delete { id } => (DELETE_TODO, json!({ "input": { "id": id } })),
        };
        GraphqlRequest {
            query: query.to_string(),
            variables,
            operation_name: Some(self.operation_name().to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: String,
    #[serde(default)]
    pub variables: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphqlResponse<D> {
    pub data: Option<D>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlError>,
}

/// Wire shape of an Amplify `Todo`. Every field is optional so that a bad
/// payload surfaces as a [`DecodeError`] rather than a serde failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Item> for TodoRecord {
    fn from(item: &Item) -> Self {
        Self {
            id: Some(item.id.0.clone()),
            name: Some(item.name.clone()),
            description: item.description.clone(),
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

impl TryFrom<TodoRecord> for Item {
    type Error = DecodeError;

    fn try_from(record: TodoRecord) -> Result<Self, Self::Error> {
        let id = record.id.ok_or(DecodeError::MissingField("id"))?;
        if id.is_empty() {
            return Err(DecodeError::EmptyField("id"));
        }
        let name = record.name.ok_or(DecodeError::MissingField("name"))?;
        if name.is_empty() {
            return Err(DecodeError::EmptyField("name"));
        }
        Ok(Item {
            id: ItemId(id),
            name,
            description: record.description,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTodoConnection {
    #[serde(default)]
    pub items: Vec<Option<TodoRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTodosData {
    #[serde(default)]
    pub list_todos: Option<ModelTodoConnection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoData {
    #[serde(default)]
    pub create_todo: Option<TodoRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoData {
    #[serde(default)]
    pub update_todo: Option<TodoRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTodoData {
    #[serde(default)]
    pub delete_todo: Option<TodoRecord>,
}

/// Result of decoding a `listTodos` payload: the usable items, how many null
/// entries the connection carried, and the records that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedList {
    pub items: Vec<Item>,
    pub skipped_nulls: usize,
    pub rejected: Vec<(Option<String>, DecodeError)>,
}

impl ListTodosData {
    /// Only a missing connection fails the whole listing. A record that does
    /// not decode is set aside in `rejected` with its id, if it had one.
    pub fn decode(self) -> Result<DecodedList, DecodeError> {
        let connection = self
            .list_todos
            .ok_or(DecodeError::MissingData("listTodos"))?;
        let mut items = Vec::with_capacity(connection.items.len());
        let mut skipped_nulls = 0;
        let mut rejected = Vec::new();
        for record in connection.items {
            let Some(record) = record else {
                skipped_nulls += 1;
                continue;
            };
            let id = record.id.clone();
            match Item::try_from(record) {
                Ok(item) => items.push(item),
                Err(err) => rejected.push((id, err)),
            }
        }
        Ok(DecodedList {
            items,
            skipped_nulls,
            rejected,
        })
    }
}

impl CreateTodoData {
    pub fn decode(self) -> Result<Item, DecodeError> {
        let record = self
            .create_todo
            .ok_or(DecodeError::MissingData("createTodo"))?;
        Item::try_from(record)
    }
}

impl UpdateTodoData {
    pub fn decode(self) -> Result<(), DecodeError> {
        self.update_todo
            .map(|_| ())
            .ok_or(DecodeError::MissingData("updateTodo"))
    }
}

impl DeleteTodoData {
    pub fn decode(self) -> Result<(), DecodeError> {
        self.delete_todo
            .map(|_| ())
            .ok_or(DecodeError::MissingData("deleteTodo"))
    }
}

/// Parses a raw GraphQL body into `data` of type `D`, keeping any `errors`.
pub fn parse_response<D: DeserializeOwned>(
    body: &[u8],
) -> Result<GraphqlResponse<D>, serde_json::Error> {
    serde_json::from_slice(body)
}
