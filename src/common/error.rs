use thiserror::Error;

/// Failure taxonomy for one processing request. Every case is terminal for
/// the invocation: nothing is retried and no partial output is produced.
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Modo inválido: '{0}'. Use 'audited' ou 'not-audited'")]
    InvalidMode(String),

    #[error("Coluna '{0}' não encontrada na planilha")]
    MissingColumn(String),

    #[error("Erro ao processar a planilha: {0}")]
    Processing(String),
}

pub type Result<T> = std::result::Result<T, ProcessorError>;
