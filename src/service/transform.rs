use bson::Document;

/// Post-processing applied to every fetched result set.
pub trait ResultTransform: Send + Sync {
    fn transform(&self, records: Vec<Document>) -> Vec<Document>;
}

/// Returns records unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl ResultTransform for IdentityTransform {
    fn transform(&self, records: Vec<Document>) -> Vec<Document> {
        records
    }
}

impl<F> ResultTransform for F
where
    F: Fn(Vec<Document>) -> Vec<Document> + Send + Sync,
{
    fn transform(&self, records: Vec<Document>) -> Vec<Document> {
        self(records)
    }
}
