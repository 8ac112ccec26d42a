use thiserror::Error;

use crate::span::Span;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read source: {0}")]
    SourceIo(#[from] std::io::Error),
    #[error("unsupported emit format: {0}")]
    UnsupportedFormat(String),
    #[error("unsupported atom width: {0} bits (expected 8, 16, 32 or 64)")]
    UnsupportedAtomWidth(u32),
    #[error("lex error at byte {}: illegal character {literal:?}", .span.start)]
    LexError { span: Span, literal: String },
    #[error("parse error at byte {}: {message}", .span.start)]
    ParseError { span: Span, message: String },
    #[error("parse error at byte {}: unknown rune {rune}", .span.start)]
    UnknownRune { span: Span, rune: String },
    #[error("reduction error at byte {}: {message}", .span.start)]
    ReduceError { span: Span, message: String },
    #[error("codegen error at byte {}: {message}", .span.start)]
    CodegenError { span: Span, message: String },
    #[error("malformed IR: {0}")]
    InvalidIr(String),
}

impl CoreError {
    pub(crate) fn parse(span: Span, message: impl Into<String>) -> Self {
        CoreError::ParseError {
            span,
            message: message.into(),
        }
    }

    pub(crate) fn reduce(span: Span, message: impl Into<String>) -> Self {
        CoreError::ReduceError {
            span,
            message: message.into(),
        }
    }

    pub(crate) fn codegen(span: Span, message: impl Into<String>) -> Self {
        CoreError::CodegenError {
            span,
            message: message.into(),
        }
    }

    /// Location of the offending source text, if the error has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            CoreError::LexError { span, .. }
            | CoreError::ParseError { span, .. }
            | CoreError::UnknownRune { span, .. }
            | CoreError::ReduceError { span, .. }
            | CoreError::CodegenError { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// Short message without the location prefix, for diagnostics that
    /// render the location themselves.
    pub fn message(&self) -> String {
        match self {
            CoreError::LexError { literal, .. } => format!("illegal character {literal:?}"),
            CoreError::ParseError { message, .. }
            | CoreError::ReduceError { message, .. }
            | CoreError::CodegenError { message, .. } => message.clone(),
            CoreError::UnknownRune { rune, .. } => format!("unknown rune {rune}"),
            other => other.to_string(),
        }
    }

    /// Name of the pipeline stage that raised the error.
    pub fn stage(&self) -> &'static str {
        match self {
            CoreError::SourceIo(_) => "io",
            CoreError::UnsupportedFormat(_) | CoreError::UnsupportedAtomWidth(_) => "config",
            CoreError::LexError { .. } => "lex",
            CoreError::ParseError { .. } | CoreError::UnknownRune { .. } => "parse",
            CoreError::ReduceError { .. } => "reduce",
            CoreError::CodegenError { .. } | CoreError::InvalidIr(_) => "codegen",
        }
    }
}
