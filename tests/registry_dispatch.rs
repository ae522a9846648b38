use std::sync::Arc;

use data_preview::formats::{FormatFamily, FormatToken, FORMAT_DESCRIPTORS};
use data_preview::ingestion::FormatRegistry;
use data_preview::providers::{
    DataProvider, HierarchicalConfigProvider, ParseContext, ParsedSource,
};
use data_preview::types::{Row, Value};
use data_preview::{FormatResult, IngestionError};

/// Claims `.log` plus whatever extra tokens a test asks for.
struct LogProvider {
    extra: Vec<String>,
}

impl DataProvider for LogProvider {
    fn family(&self) -> FormatFamily {
        FormatFamily::DelimitedText
    }

    fn tokens(&self) -> Vec<String> {
        let mut tokens = vec!["log".to_string()];
        tokens.extend(self.extra.iter().cloned());
        tokens
    }

    fn parse(&self, _ctx: &ParseContext<'_>, bytes: &[u8]) -> FormatResult<ParsedSource> {
        let rows = String::from_utf8_lossy(bytes)
            .lines()
            .map(|l| Row::new().with("entry", l))
            .collect();
        Ok(ParsedSource::rows(rows))
    }
}

fn source_for(token: &str) -> String {
    if token.contains('.') {
        format!("some/dir/{token}")
    } else {
        format!("some/dir/file.{token}")
    }
}

#[test]
fn every_builtin_token_resolves_to_its_family() {
    let registry = FormatRegistry::with_builtin_providers().unwrap();
    for d in FORMAT_DESCRIPTORS {
        let source = source_for(d.token);
        assert_eq!(registry.resolve(&source).family(), d.family, "source {source}");
        assert!(registry.is_registered(d.token));
    }
}

#[test]
fn resolution_is_case_insensitive() {
    let registry = FormatRegistry::with_builtin_providers().unwrap();
    assert_eq!(registry.resolve("C:\\Data\\REPORT.XLSX").family(), FormatFamily::SpreadsheetLike);
    assert_eq!(registry.resolve("https://host/x/Table.Parquet?dl=1").family(), FormatFamily::ColumnarBinary);
}

#[test]
fn well_known_file_names_resolve_by_name() {
    let registry = FormatRegistry::with_builtin_providers().unwrap();
    for source in ["repo/Cargo.lock", "repo/composer.lock", "repo/.babelrc", "repo/Pipfile"] {
        assert_eq!(
            registry.resolve(source).family(),
            FormatFamily::HierarchicalConfig,
            "source {source}"
        );
    }
}

#[test]
fn unknown_tokens_fall_back_to_config_provider() {
    let registry = FormatRegistry::with_builtin_providers().unwrap();
    for source in ["Dockerfile", "build/Makefile", "notes.unknownext", "weird."] {
        assert_eq!(
            registry.resolve(source).family(),
            FormatFamily::HierarchicalConfig,
            "source {source}"
        );
    }
    assert!(!registry.is_registered("dockerfile"));
}

#[test]
fn empty_registry_resolves_everything_to_default() {
    let registry = FormatRegistry::new(Arc::new(HierarchicalConfigProvider));
    assert_eq!(registry.tokens().count(), 0);
    assert_eq!(registry.resolve("data.csv").family(), FormatFamily::HierarchicalConfig);
}

#[test]
fn custom_provider_claims_new_token() {
    let mut registry = FormatRegistry::with_builtin_providers().unwrap();
    registry.register(Arc::new(LogProvider { extra: vec![] })).unwrap();

    let token = FormatToken::from_source("server.log");
    let ctx = ParseContext {
        token: &token,
        dataset: "",
        flatten: Default::default(),
    };
    let parsed = registry.resolve("server.log").parse(&ctx, b"boot\nready\n").unwrap();
    let rows = parsed.payload.into_rows().unwrap();
    assert_eq!(rows[1].get("entry"), Some(&Value::Utf8("ready".into())));
}

#[test]
fn duplicate_token_is_a_configuration_error() {
    let mut registry = FormatRegistry::with_builtin_providers().unwrap();
    let err = registry
        .register(Arc::new(LogProvider {
            extra: vec!["CSV".to_string()],
        }))
        .unwrap_err();

    match err {
        IngestionError::Configuration {
            token,
            existing,
            incoming,
        } => {
            assert_eq!(token, "csv");
            assert_eq!(existing, FormatFamily::DelimitedText);
            assert_eq!(incoming, FormatFamily::DelimitedText);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Nothing from the rejected provider was registered.
    assert!(!registry.is_registered("log"));
}

#[test]
fn registering_builtins_twice_is_rejected() {
    let mut registry = FormatRegistry::with_builtin_providers().unwrap();
    let err = registry.register(Arc::new(HierarchicalConfigProvider)).unwrap_err();
    assert!(matches!(err, IngestionError::Configuration { .. }));
}

#[test]
fn describe_reports_capabilities() {
    let registry = FormatRegistry::with_builtin_providers().unwrap();

    let txt = registry.describe("readme.txt").unwrap();
    assert!(txt.capabilities.parse);
    assert!(!txt.capabilities.serialize);

    let xlsx = registry.describe("book.xlsx").unwrap();
    assert!(xlsx.capabilities.datasets && xlsx.capabilities.serialize);

    let lock = registry.describe("Cargo.lock").unwrap();
    assert_eq!(lock.token, "cargo.lock");

    assert!(registry.describe("Dockerfile").is_none());
}
