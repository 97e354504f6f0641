//! Record conversion and the document store operations of TantivyStore

use crate::compiler::ExecutableQuery;
use crate::data::{AttributeValue, DocumentRecord};
use crate::engine::config::AttributeType;
use crate::engine::core::TantivyStore;
use crate::engine::store::{DocumentStore, StoreError};
use chrono::{DateTime, Utc};
use std::sync::MutexGuard;
use tantivy::{
    collector::{Count, TopDocs},
    query::TermQuery,
    schema::{IndexRecordOption, TantivyDocument, Term, Value},
    IndexWriter, Searcher,
};

impl TantivyStore {
    /// Convert a record into a tantivy document, one field per registry attribute
    pub(crate) fn to_tantivy_document(&self, record: &DocumentRecord) -> Result<TantivyDocument, StoreError> {
        let mut doc = TantivyDocument::default();
        for spec in self.registry.attributes() {
            let field = self.field(&spec.name)?;
            match record.value(&spec.name) {
                Some(AttributeValue::Text(text)) => doc.add_text(field, text),
                Some(AttributeValue::Date(at)) => doc.add_date(field, to_index_date(at)),
                None => {}
            }
        }
        Ok(doc)
    }

    /// Rebuild a record from the stored fields of a tantivy document
    pub(crate) fn to_record(&self, doc: &TantivyDocument) -> Result<DocumentRecord, StoreError> {
        let mut builder = DocumentRecord::builder(String::new());
        for spec in self.registry.attributes() {
            let field = self.field(&spec.name)?;
            let Some(value) = doc.get_first(field) else {
                continue;
            };
            builder = match spec.attribute_type {
                AttributeType::Date => match value.as_datetime().and_then(from_index_date) {
                    Some(at) => builder.date(&spec.name, at)?,
                    None => builder,
                },
                AttributeType::Text | AttributeType::String => match value.as_str() {
                    Some(text) => builder.text(&spec.name, text.to_string())?,
                    None => builder,
                },
            };
        }
        Ok(builder.build(&self.registry)?)
    }

    fn id_query(&self, id: &str) -> TermQuery {
        TermQuery::new(Term::from_field_text(self.id_field, id), IndexRecordOption::Basic)
    }

    fn count_id(&self, searcher: &Searcher, id: &str) -> Result<usize, StoreError> {
        Ok(searcher.search(&self.id_query(id), &Count)?)
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, IndexWriter>, StoreError> {
        self.writer
            .as_ref()
            .ok_or(StoreError::ReadOnly)?
            .lock()
            .map_err(|_| StoreError::Poisoned)
    }

    /// Commit pending operations; on failure roll back so nothing partial becomes visible
    fn commit(&self, writer: &mut IndexWriter) -> Result<(), StoreError> {
        if let Err(err) = writer.commit() {
            if let Err(rollback_err) = writer.rollback() {
                log::error!("Rollback after failed commit also failed: {}", rollback_err);
            }
            return Err(err.into());
        }
        self.reader.reload()?;
        Ok(())
    }

    /// Run a translated query against the current searcher
    pub(crate) fn search_records(&self, query: &ExecutableQuery) -> Result<Vec<DocumentRecord>, StoreError> {
        self.reader.reload()?;
        let searcher = self.reader.searcher();
        self.execute(&searcher, query)
    }
}

impl DocumentStore for TantivyStore {
    fn exists_by_id(&self, id: &str) -> Result<bool, StoreError> {
        self.reader.reload()?;
        Ok(self.count_id(&self.reader.searcher(), id)? > 0)
    }

    fn save(&self, record: &DocumentRecord) -> Result<(), StoreError> {
        let mut writer = self.lock_writer()?;

        // Existence is re-checked under the writer lock, which makes the save conditional.
        self.reader.reload()?;
        if self.count_id(&self.reader.searcher(), record.id())? > 0 {
            return Err(StoreError::DuplicateKey(record.id().to_string()));
        }

        let doc = self.to_tantivy_document(record)?;
        if let Err(err) = writer.add_document(doc) {
            if let Err(rollback_err) = writer.rollback() {
                log::error!("Rollback after failed add also failed: {}", rollback_err);
            }
            return Err(err.into());
        }
        self.commit(&mut writer)?;
        log::debug!("Saved record {}", record.id());
        Ok(())
    }

    fn query(&self, query: &ExecutableQuery) -> Result<Vec<DocumentRecord>, StoreError> {
        self.search_records(query)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<DocumentRecord>, StoreError> {
        self.reader.reload()?;
        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&self.id_query(id), &TopDocs::with_limit(1))?;
        match top_docs.first() {
            Some((_, address)) => {
                let doc: TantivyDocument = searcher.doc(*address)?;
                Ok(Some(self.to_record(&doc)?))
            }
            None => Ok(None),
        }
    }

    fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        let mut writer = self.lock_writer()?;
        self.reader.reload()?;
        if self.count_id(&self.reader.searcher(), id)? == 0 {
            return Ok(false);
        }
        writer.delete_term(Term::from_field_text(self.id_field, id));
        self.commit(&mut writer)?;
        log::info!("Deleted record {}", id);
        Ok(true)
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        let mut writer = self.lock_writer()?;
        writer.delete_all_documents()?;
        self.commit(&mut writer)?;
        log::info!("Deleted all records");
        Ok(())
    }

    fn count(&self) -> Result<u64, StoreError> {
        self.reader.reload()?;
        Ok(self.reader.searcher().num_docs())
    }
}

fn to_index_date(at: DateTime<Utc>) -> tantivy::DateTime {
    tantivy::DateTime::from_timestamp_secs(at.timestamp())
}

fn from_index_date(at: tantivy::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(at.into_timestamp_secs(), 0)
}
