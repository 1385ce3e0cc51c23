//! In-memory collection handle
//!
//! Every operation takes the collection's lock for its whole duration, so
//! single-document operations are atomic with respect to each other, the
//! way a server applies a single write.

use fsm_core::error::{CommandError, CommandResult, ErrorCode};
use fsm_core::traits::Collection;
use fsm_core::types::{DeleteResult, IndexSpec, UpdateOptions, UpdateResult, ID_INDEX_NAME};
use fsm_core::value::{Document, Value};
use std::sync::Arc;

use crate::index::{check_unique, first_duplicate, index_key};
use crate::matcher::{apply_update, get_path, is_operator_update, matches, upsert_seed};
use crate::server::{CollectionData, OpCounters, ServerState};

/// Handle to one collection of an in-memory server
pub struct MemoryCollection {
    server: Arc<ServerState>,
    db: String,
    name: String,
}

impl MemoryCollection {
    pub(crate) fn new(server: Arc<ServerState>, db: &str, name: &str) -> Self {
        MemoryCollection {
            server,
            db: db.to_string(),
            name: name.to_string(),
        }
    }

    fn full_name(&self) -> String {
        format!("{}.{}", self.db, self.name)
    }

    fn not_found(&self) -> CommandError {
        CommandError::new(
            ErrorCode::NAMESPACE_NOT_FOUND,
            format!("ns does not exist: {}", self.full_name()),
        )
    }

    /// Run `f` against the collection contents for reading; a missing
    /// collection reads as empty.
    fn read<T>(&self, command: &str, f: impl FnOnce(&CollectionData) -> CommandResult<T>, empty: T) -> CommandResult<T> {
        self.server.failpoints.check(command)?;
        OpCounters::bump(&self.server.opcounters.query);
        match self.server.collection(&self.db, &self.name) {
            Some(state) => f(&state.data.read()),
            None => Ok(empty),
        }
    }

    /// Run `f` against the collection contents for writing, creating the
    /// collection on demand.
    fn write<T>(&self, command: &str, f: impl FnOnce(&mut CollectionData) -> CommandResult<T>) -> CommandResult<T> {
        self.server.failpoints.check(command)?;
        let (state, _) = self.server.collection_or_create(&self.db, &self.name);
        let mut data = state.data.write();
        f(&mut data)
    }

    fn update_matching(
        &self,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
        multi: bool,
    ) -> CommandResult<UpdateResult> {
        OpCounters::bump(&self.server.opcounters.update);
        let replacement = !is_operator_update(update)?;
        if replacement && multi {
            return Err(CommandError::new(
                ErrorCode::BAD_VALUE,
                "multi update only works with $ operators",
            ));
        }
        self.write("update", |data| {
            let mut result = UpdateResult::default();
            for pos in 0..data.docs.len() {
                if !matches(&data.docs[pos], filter)? {
                    continue;
                }
                result.matched += 1;
                let mut candidate = data.docs[pos].clone();
                if apply_update(&mut candidate, update)? {
                    check_unique(data, &candidate, Some(pos))?;
                    data.docs[pos] = candidate;
                    result.modified += 1;
                }
                if !multi {
                    break;
                }
            }

            if result.matched == 0 && options.upsert {
                let mut doc = upsert_seed(filter)?;
                if replacement {
                    let id = doc.remove("_id");
                    doc = update.clone();
                    if let Some(id) = id {
                        doc.entry("_id".to_string()).or_insert(id);
                    }
                } else {
                    apply_update(&mut doc, update)?;
                }
                let id = insert_into(data, doc)?;
                result.upserted_id = Some(id);
            }
            Ok(result)
        })
    }

    fn delete_matching(&self, filter: &Document, multi: bool) -> CommandResult<DeleteResult> {
        OpCounters::bump(&self.server.opcounters.delete);
        self.server.failpoints.check("delete")?;
        let Some(state) = self.server.collection(&self.db, &self.name) else {
            return Ok(DeleteResult::default());
        };
        let mut data = state.data.write();
        let mut deleted = 0;
        let mut pos = 0;
        while pos < data.docs.len() {
            if matches(&data.docs[pos], filter)? {
                data.docs.remove(pos);
                deleted += 1;
                if !multi {
                    break;
                }
            } else {
                pos += 1;
            }
        }
        Ok(DeleteResult { deleted })
    }
}

/// Insert one document, generating `_id` when absent
fn insert_into(data: &mut CollectionData, mut doc: Document) -> CommandResult<Value> {
    let id = doc
        .entry("_id".to_string())
        .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()))
        .clone();
    check_unique(data, &doc, None)?;
    data.docs.push(doc);
    Ok(id)
}

impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert_one(&self, doc: Document) -> CommandResult<Value> {
        OpCounters::bump(&self.server.opcounters.insert);
        self.write("insert", |data| insert_into(data, doc))
    }

    fn insert_many(&self, docs: Vec<Document>) -> CommandResult<Vec<Value>> {
        self.write("insert", |data| {
            let mut ids = Vec::with_capacity(docs.len());
            for doc in docs {
                OpCounters::bump(&self.server.opcounters.insert);
                ids.push(insert_into(data, doc)?);
            }
            Ok(ids)
        })
    }

    fn update_one(
        &self,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> CommandResult<UpdateResult> {
        self.update_matching(filter, update, options, false)
    }

    fn update_many(&self, filter: &Document, update: &Document) -> CommandResult<UpdateResult> {
        self.update_matching(filter, update, UpdateOptions::default(), true)
    }

    fn delete_one(&self, filter: &Document) -> CommandResult<DeleteResult> {
        self.delete_matching(filter, false)
    }

    fn delete_many(&self, filter: &Document) -> CommandResult<DeleteResult> {
        self.delete_matching(filter, true)
    }

    fn find(&self, filter: &Document) -> CommandResult<Vec<Document>> {
        self.read(
            "find",
            |data| {
                let mut out = Vec::new();
                for doc in &data.docs {
                    if matches(doc, filter)? {
                        out.push(doc.clone());
                    }
                }
                Ok(out)
            },
            Vec::new(),
        )
    }

    fn count_documents(&self, filter: &Document) -> CommandResult<u64> {
        self.read(
            "count",
            |data| {
                let mut n = 0;
                for doc in &data.docs {
                    if matches(doc, filter)? {
                        n += 1;
                    }
                }
                Ok(n)
            },
            0,
        )
    }

    fn aggregate_count(&self, filter: &Document, field: &str) -> CommandResult<Vec<(Value, u64)>> {
        self.read(
            "aggregate",
            |data| {
                let mut groups: Vec<(Value, u64)> = Vec::new();
                for doc in &data.docs {
                    if !matches(doc, filter)? {
                        continue;
                    }
                    let key = get_path(doc, field)
                        .cloned()
                        .unwrap_or(Value::Null);
                    match groups.iter_mut().find(|(k, _)| k.query_eq(&key)) {
                        Some((_, n)) => *n += 1,
                        None => groups.push((key, 1)),
                    }
                }
                groups.sort_by(|a, b| a.0.query_cmp(&b.0));
                Ok(groups)
            },
            Vec::new(),
        )
    }

    fn create_index(&self, spec: IndexSpec) -> CommandResult<()> {
        OpCounters::bump(&self.server.opcounters.command);
        if spec.keys.is_empty() {
            return Err(CommandError::new(ErrorCode::BAD_VALUE, "index key pattern is empty"));
        }
        self.write("createIndexes", |data| {
            if let Some(existing) = data
                .indexes
                .iter()
                .find(|ix| ix.name == spec.name || ix.keys == spec.keys)
            {
                if *existing == spec {
                    return Ok(());
                }
                return Err(CommandError::new(
                    ErrorCode::INDEX_OPTIONS_CONFLICT,
                    format!(
                        "index {} conflicts with existing index {}",
                        spec.name, existing.name
                    ),
                ));
            }
            if spec.unique {
                if let Some((_, dup)) = first_duplicate(&data.docs, &spec) {
                    return Err(CommandError::new(
                        ErrorCode::DUPLICATE_KEY,
                        format!(
                            "cannot build unique index {}: duplicate key {:?}",
                            spec.name,
                            index_key(&data.docs[dup], &spec)
                        ),
                    ));
                }
            }
            tracing::debug!(ns = %self.full_name(), index = %spec.name, "created index");
            data.indexes.push(spec);
            Ok(())
        })
    }

    fn drop_index(&self, name: &str) -> CommandResult<()> {
        OpCounters::bump(&self.server.opcounters.command);
        self.server.failpoints.check("dropIndexes")?;
        if name == ID_INDEX_NAME {
            return Err(CommandError::new(ErrorCode::BAD_VALUE, "cannot drop _id index"));
        }
        let state = self
            .server
            .collection(&self.db, &self.name)
            .ok_or_else(|| self.not_found())?;
        let mut data = state.data.write();
        let before = data.indexes.len();
        data.indexes.retain(|ix| ix.name != name);
        if data.indexes.len() == before {
            return Err(CommandError::new(
                ErrorCode::INDEX_NOT_FOUND,
                format!("index not found with name [{}]", name),
            ));
        }
        Ok(())
    }

    fn drop_indexes(&self) -> CommandResult<()> {
        OpCounters::bump(&self.server.opcounters.command);
        self.server.failpoints.check("dropIndexes")?;
        let state = self
            .server
            .collection(&self.db, &self.name)
            .ok_or_else(|| self.not_found())?;
        state.data.write().indexes.retain(|ix| ix.name == ID_INDEX_NAME);
        Ok(())
    }

    fn list_indexes(&self) -> CommandResult<Vec<IndexSpec>> {
        OpCounters::bump(&self.server.opcounters.command);
        self.server.failpoints.check("listIndexes")?;
        let state = self
            .server
            .collection(&self.db, &self.name)
            .ok_or_else(|| self.not_found())?;
        let indexes = state.data.read().indexes.clone();
        Ok(indexes)
    }

    fn drop_collection(&self) -> CommandResult<bool> {
        OpCounters::bump(&self.server.opcounters.command);
        self.server.failpoints.check("drop")?;
        Ok(self.server.drop_collection(&self.db, &self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsm_core::doc;

    fn coll() -> MemoryCollection {
        MemoryCollection::new(Arc::new(ServerState::new()), "db", "c")
    }

    #[test]
    fn test_insert_generates_id() {
        let c = coll();
        let id = c.insert_one(doc! { "x" => 1 }).unwrap();
        assert!(id.as_str().is_some());
        let found = c.find_one(&doc! { "x" => 1 }).unwrap().unwrap();
        assert_eq!(found.get("_id"), Some(&id));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let c = coll();
        c.insert_one(doc! { "_id" => 1 }).unwrap();
        let err = c.insert_one(doc! { "_id" => 1 }).unwrap_err();
        assert_eq!(err.code, ErrorCode::DUPLICATE_KEY);
        assert_eq!(c.count_documents(&doc! {}).unwrap(), 1);
    }

    #[test]
    fn test_insert_many_stops_at_first_failure() {
        let c = coll();
        let err = c
            .insert_many(vec![doc! { "_id" => 1 }, doc! { "_id" => 1 }, doc! { "_id" => 2 }])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DUPLICATE_KEY);
        assert_eq!(c.count_documents(&doc! {}).unwrap(), 1);
    }

    #[test]
    fn test_unique_secondary_index() {
        let c = coll();
        c.create_index(IndexSpec::ascending("k").unique()).unwrap();
        c.insert_one(doc! { "k" => 1 }).unwrap();
        let err = c.insert_one(doc! { "k" => 1.0 }).unwrap_err();
        assert_eq!(err.code, ErrorCode::DUPLICATE_KEY);
    }

    #[test]
    fn test_unique_index_build_fails_on_existing_duplicates() {
        let c = coll();
        c.insert_one(doc! { "k" => 1 }).unwrap();
        c.insert_one(doc! { "k" => 1 }).unwrap();
        let err = c.create_index(IndexSpec::ascending("k").unique()).unwrap_err();
        assert_eq!(err.code, ErrorCode::DUPLICATE_KEY);
        assert_eq!(c.list_indexes().unwrap().len(), 1);
    }

    #[test]
    fn test_create_index_idempotent_and_conflicting() {
        let c = coll();
        c.create_index(IndexSpec::ascending("a")).unwrap();
        c.create_index(IndexSpec::ascending("a")).unwrap();
        assert_eq!(c.list_indexes().unwrap().len(), 2);
        let err = c.create_index(IndexSpec::ascending("a").unique()).unwrap_err();
        assert_eq!(err.code, ErrorCode::INDEX_OPTIONS_CONFLICT);
    }

    #[test]
    fn test_drop_index() {
        let c = coll();
        c.create_index(IndexSpec::ascending("a")).unwrap();
        c.drop_index("a_1").unwrap();
        assert_eq!(c.drop_index("a_1").unwrap_err().code, ErrorCode::INDEX_NOT_FOUND);
        assert_eq!(c.drop_index(ID_INDEX_NAME).unwrap_err().code, ErrorCode::BAD_VALUE);
    }

    #[test]
    fn test_list_indexes_missing_collection() {
        let c = coll();
        assert_eq!(c.list_indexes().unwrap_err().code, ErrorCode::NAMESPACE_NOT_FOUND);
    }

    #[test]
    fn test_update_one_and_many() {
        let c = coll();
        for i in 0..3 {
            c.insert_one(doc! { "_id" => i, "g" => "a", "n" => 0 }).unwrap();
        }
        let r = c
            .update_one(&doc! { "g" => "a" }, &doc! { "$inc" => doc! { "n" => 1 } }, UpdateOptions::default())
            .unwrap();
        assert_eq!((r.matched, r.modified), (1, 1));
        let r = c
            .update_many(&doc! { "g" => "a" }, &doc! { "$inc" => doc! { "n" => 1 } })
            .unwrap();
        assert_eq!((r.matched, r.modified), (3, 3));
        assert_eq!(c.count_documents(&doc! { "n" => 2 }).unwrap(), 1);
    }

    #[test]
    fn test_upsert_inserts_when_unmatched() {
        let c = coll();
        let r = c
            .update_one(
                &doc! { "_id" => "counter" },
                &doc! { "$inc" => doc! { "n" => 5 } },
                UpdateOptions::upsert(),
            )
            .unwrap();
        assert_eq!(r.upserted_id, Some(Value::from("counter")));
        let d = c.find_one(&doc! { "_id" => "counter" }).unwrap().unwrap();
        assert_eq!(d.get("n"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_update_violating_unique_index() {
        let c = coll();
        c.create_index(IndexSpec::ascending("k").unique()).unwrap();
        c.insert_one(doc! { "_id" => 1, "k" => 1 }).unwrap();
        c.insert_one(doc! { "_id" => 2, "k" => 2 }).unwrap();
        let err = c
            .update_one(&doc! { "_id" => 2 }, &doc! { "$set" => doc! { "k" => 1 } }, UpdateOptions::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DUPLICATE_KEY);
    }

    #[test]
    fn test_delete_one_and_many() {
        let c = coll();
        for i in 0..4 {
            c.insert_one(doc! { "_id" => i, "even" => i % 2 == 0 }).unwrap();
        }
        assert_eq!(c.delete_one(&doc! { "even" => true }).unwrap().deleted, 1);
        assert_eq!(c.delete_many(&doc! {}).unwrap().deleted, 3);
    }

    #[test]
    fn test_aggregate_count_groups() {
        let c = coll();
        for (i, g) in ["a", "b", "a"].iter().enumerate() {
            c.insert_one(doc! { "_id" => i, "g" => *g }).unwrap();
        }
        c.insert_one(doc! { "_id" => 9 }).unwrap();
        let groups = c.aggregate_count(&doc! {}, "g").unwrap();
        assert_eq!(
            groups,
            vec![(Value::Null, 1), (Value::from("a"), 2), (Value::from("b"), 1)]
        );
    }

    #[test]
    fn test_reads_on_missing_collection_are_empty() {
        let c = coll();
        assert!(c.find(&doc! {}).unwrap().is_empty());
        assert_eq!(c.count_documents(&doc! {}).unwrap(), 0);
        assert!(!c.drop_collection().unwrap());
    }
}
