//! In-memory database handle and command dispatch
//!
//! Supported commands:
//!
//! | Command              | Reply                                          |
//! |----------------------|------------------------------------------------|
//! | `ping`               | `{ok: 1}`                                      |
//! | `serverStatus`       | `{opcounters, connections{current, totalCreated}}` |
//! | `currentOp`          | `{inprog: []}`                                 |
//! | `create`             | `NamespaceExists` if present                   |
//! | `drop`               | `NamespaceNotFound` if absent                  |
//! | `count`              | `{n}` for the optional `query` filter          |
//! | `listCollections`    | `{cursor: {firstBatch: [{name, type}]}}`       |
//! | `dropDatabase`       | `{dropped}`                                    |
//! | `configureFailPoint` | see [`crate::failpoint`]                       |

use fsm_core::error::{CommandError, CommandResult, ErrorCode};
use fsm_core::traits::{Collection, Database};
use fsm_core::value::{Document, Value};
use fsm_core::doc;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::collection::MemoryCollection;
use crate::server::{OpCounters, ServerState};

const COMMANDS: &[&str] = &[
    "ping",
    "serverStatus",
    "currentOp",
    "create",
    "drop",
    "count",
    "listCollections",
    "dropDatabase",
    "configureFailPoint",
];

/// Handle to one database of an in-memory server
pub struct MemoryDatabase {
    server: Arc<ServerState>,
    name: String,
}

impl MemoryDatabase {
    pub(crate) fn new(server: Arc<ServerState>, name: &str) -> Self {
        MemoryDatabase {
            server,
            name: name.to_string(),
        }
    }

    fn collection_arg<'a>(&self, command: &'a Document, key: &str) -> CommandResult<&'a str> {
        command.get(key).and_then(Value::as_str).ok_or_else(|| {
            CommandError::new(
                ErrorCode::TYPE_MISMATCH,
                format!("collection name has invalid type for '{}'", key),
            )
        })
    }

    fn ns(&self, coll: &str) -> String {
        format!("{}.{}", self.name, coll)
    }

    fn server_status(&self) -> Document {
        let current = self.server.current_connections.load(Ordering::Relaxed) as i64;
        let total = self.server.total_connections.load(Ordering::Relaxed) as i64;
        doc! {
            "ok" => 1,
            "opcounters" => self.server.opcounters.to_document(),
            "connections" => doc! { "current" => current, "totalCreated" => total },
        }
    }

    fn create(&self, command: &Document) -> CommandResult<Document> {
        let coll = self.collection_arg(command, "create")?;
        let (_, created) = self.server.collection_or_create(&self.name, coll);
        if !created {
            return Err(CommandError::new(
                ErrorCode::NAMESPACE_EXISTS,
                format!("Collection {} already exists.", self.ns(coll)),
            ));
        }
        Ok(doc! { "ok" => 1 })
    }

    fn drop_command(&self, command: &Document) -> CommandResult<Document> {
        let coll = self.collection_arg(command, "drop")?;
        let indexes = match self.server.collection(&self.name, coll) {
            Some(state) => state.data.read().indexes.len(),
            None => {
                return Err(CommandError::new(
                    ErrorCode::NAMESPACE_NOT_FOUND,
                    "ns not found",
                ))
            }
        };
        self.server.drop_collection(&self.name, coll);
        Ok(doc! { "ok" => 1, "ns" => self.ns(coll), "nIndexesWas" => indexes })
    }

    fn count(&self, command: &Document) -> CommandResult<Document> {
        let coll = self.collection_arg(command, "count")?;
        let query = match command.get("query") {
            Some(Value::Object(q)) => q.clone(),
            Some(Value::Null) | None => Document::new(),
            Some(other) => {
                return Err(CommandError::new(
                    ErrorCode::TYPE_MISMATCH,
                    format!("query must be an object, not {}", other.type_name()),
                ))
            }
        };
        let n = MemoryCollection::new(Arc::clone(&self.server), &self.name, coll)
            .count_documents(&query)?;
        Ok(doc! { "ok" => 1, "n" => n as i64 })
    }

    fn list_collections(&self) -> Document {
        let batch: Vec<Value> = self
            .server
            .collection_names(&self.name)
            .into_iter()
            .map(|name| Value::from(doc! { "name" => name, "type" => "collection" }))
            .collect();
        doc! {
            "ok" => 1,
            "cursor" => doc! {
                "id" => 0,
                "ns" => self.ns("$cmd.listCollections"),
                "firstBatch" => batch,
            },
        }
    }
}

impl Database for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self, name: &str) -> Arc<dyn Collection> {
        Arc::new(MemoryCollection::new(Arc::clone(&self.server), &self.name, name))
    }

    fn run_command(&self, command: &Document) -> CommandResult<Document> {
        let Some(name) = COMMANDS.iter().copied().find(|c| command.contains_key(*c)) else {
            let shown = command.keys().next().map(String::as_str).unwrap_or("");
            return Err(CommandError::new(
                ErrorCode::COMMAND_NOT_FOUND,
                format!("no such command: '{}'", shown),
            ));
        };

        OpCounters::bump(&self.server.opcounters.command);
        if name != "configureFailPoint" {
            self.server.failpoints.check(name)?;
        }
        tracing::trace!(db = %self.name, command = name, "run_command");

        match name {
            "ping" => Ok(doc! { "ok" => 1 }),
            "serverStatus" => Ok(self.server_status()),
            "currentOp" => Ok(doc! { "ok" => 1, "inprog" => Vec::<Value>::new() }),
            "create" => self.create(command),
            "drop" => self.drop_command(command),
            "count" => self.count(command),
            "listCollections" => Ok(self.list_collections()),
            "dropDatabase" => {
                self.server.drop_database(&self.name);
                Ok(doc! { "ok" => 1, "dropped" => self.name.as_str() })
            }
            _ => {
                self.server.failpoints.configure(command)?;
                Ok(doc! { "ok" => 1 })
            }
        }
    }

    fn list_collection_names(&self) -> CommandResult<Vec<String>> {
        Ok(self.server.collection_names(&self.name))
    }

    fn drop_database(&self) -> CommandResult<()> {
        OpCounters::bump(&self.server.opcounters.command);
        self.server.failpoints.check("dropDatabase")?;
        self.server.drop_database(&self.name);
        Ok(())
    }
}
