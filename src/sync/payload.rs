//! Wire types for the Tiny `produtos.pesquisa` endpoint.
//!
//! Tiny emits the same logical field as a JSON number on some accounts and as
//! a string on others, so every scalar goes through [`lenient_string`] and the
//! normalizer only ever sees text.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Every Tiny API 2 response is wrapped in a `retorno` object.
#[derive(Debug, Deserialize)]
pub struct SearchEnvelope {
    pub retorno: SearchResponse,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub status: String,
    #[serde(default, rename = "pagina", deserialize_with = "lenient_string")]
    pub page: Option<String>,
    #[serde(default, rename = "numero_paginas", deserialize_with = "lenient_string")]
    pub page_count: Option<String>,
    #[serde(default, rename = "produtos")]
    pub products: Option<Vec<ProductEntry>>,
    #[serde(default, rename = "erros")]
    pub errors: Option<Vec<UpstreamError>>,
}

impl SearchResponse {
    pub fn is_ok(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("ok")
    }

    pub fn error_messages(&self) -> Vec<&str> {
        self.errors
            .iter()
            .flatten()
            .map(|error| error.message.as_str())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductEntry {
    #[serde(rename = "produto")]
    pub product: RawProductPayload,
}

#[derive(Debug, Deserialize)]
pub struct UpstreamError {
    #[serde(rename = "erro")]
    pub message: String,
}

/// One product exactly as received, before any coercion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProductPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, rename = "nome", deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, rename = "codigo", deserialize_with = "lenient_string")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gtin: Option<String>,
    #[serde(default, rename = "preco", deserialize_with = "lenient_string")]
    pub price: Option<String>,
    #[serde(default, rename = "preco_custo", deserialize_with = "lenient_string")]
    pub cost_price: Option<String>,
    #[serde(default, rename = "unidade", deserialize_with = "lenient_string")]
    pub unit: Option<String>,
    #[serde(default, rename = "situacao", deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, rename = "data_criacao", deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    #[serde(default, rename = "data_alteracao", deserialize_with = "lenient_string")]
    pub updated_at: Option<String>,
}

/// Accept a JSON string, number, boolean or null as optional text.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a scalar value, found {other}"
        ))),
    }
}
