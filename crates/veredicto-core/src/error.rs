use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid criterion catalog: {0}")]
    Catalog(#[from] crate::catalog::CatalogError),

    #[error("No provider call succeeded for this article")]
    ProvidersUnavailable,
}
