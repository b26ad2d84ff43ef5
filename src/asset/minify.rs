//! JavaScript minification.
//!
//! [`TextTransform`] is the text-to-text strategy; [`OxcTransform`] backs it
//! with oxc for the three [`MinifierVariant`]s. [`Minifier`] feeds a group's
//! raw concatenated sources through one strategy.

use crate::pipeline::{PipelineError, Result};
use crate::utils::path::join_reference;
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier as OxcMinifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Failure inside a transform strategy.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransformError(pub String);

/// A text-to-text transformation over a complete script.
pub trait TextTransform {
    fn apply(&self, source: &str) -> Result<String, TransformError>;
}

/// Available strategies.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MinifierVariant {
    /// Compress and mangle local names.
    #[default]
    #[serde(alias = "uglify", alias = "UglifyJs")]
    #[value(alias = "uglify")]
    Minify,
    /// Pretty-print without changing semantics.
    #[serde(alias = "BeautifyJs")]
    #[value(alias = "pretty")]
    Beautify,
    /// Most aggressive compression.
    #[serde(alias = "closure", alias = "GoogleClosure")]
    #[value(alias = "closure")]
    Compress,
}

/// oxc-backed [`TextTransform`].
#[derive(Debug, Clone, Copy)]
pub struct OxcTransform {
    variant: MinifierVariant,
}

impl OxcTransform {
    pub const fn new(variant: MinifierVariant) -> Self {
        Self { variant }
    }
}

impl TextTransform for OxcTransform {
    fn apply(&self, source: &str) -> Result<String, TransformError> {
        let allocator = Allocator::default();
        // Classic scripts: concatenated sources are not modules
        let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();
        if let Some(error) = ret.errors.first() {
            return Err(TransformError(error.to_string()));
        }
        let mut program = ret.program;

        let compress = match self.variant {
            MinifierVariant::Beautify => {
                return Ok(Codegen::new().build(&program).code);
            }
            MinifierVariant::Minify => CompressOptions::default(),
            MinifierVariant::Compress => CompressOptions::smallest(),
        };

        let options = MinifierOptions {
            mangle: Some(MangleOptions::default()),
            compress: Some(compress),
        };
        let ret = OxcMinifier::new(options).minify(&allocator, &mut program);
        let code = Codegen::new()
            .with_options(CodegenOptions {
                minify: true,
                comments: CommentOptions::disabled(),
                ..CodegenOptions::default()
            })
            .with_scoping(ret.scoping)
            .build(&program)
            .code;
        Ok(code)
    }
}

/// Minifier adapter: raw concatenation of sources through one strategy.
pub struct Minifier {
    root: PathBuf,
    transform: Box<dyn TextTransform>,
}

impl Minifier {
    /// Minifier resolving references against `root`, using oxc.
    pub fn new(root: impl Into<PathBuf>, variant: MinifierVariant) -> Self {
        Self::with_transform(root, OxcTransform::new(variant))
    }

    pub fn with_transform(root: impl Into<PathBuf>, transform: impl TextTransform + 'static) -> Self {
        Self {
            root: root.into(),
            transform: Box::new(transform),
        }
    }

    /// Minify root-relative sources.
    pub fn minify(&self, sources: &[String]) -> Result<Vec<u8>> {
        let paths: Vec<_> = sources
            .iter()
            .map(|source| join_reference(&self.root, source))
            .collect();
        self.minify_paths(&paths)
    }

    /// Minify files given by path. Contents are concatenated untrimmed.
    pub fn minify_paths(&self, paths: &[PathBuf]) -> Result<Vec<u8>> {
        let mut combined = String::new();
        for path in paths {
            combined.push_str(&fs::read_to_string(path).map_err(PipelineError::io(path))?);
        }

        let blame = paths.first().map_or_else(|| self.root.clone(), Clone::clone);
        self.transform
            .apply(&combined)
            .map(String::into_bytes)
            .map_err(|TransformError(message)| PipelineError::Transform {
                path: blame,
                message,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SOURCE: &str = r#"
function greet(name) {
    var message = "hello " + name;
    alert(message);
}
greet("truc");
"#;

    #[test]
    fn test_minify_shrinks() {
        let out = OxcTransform::new(MinifierVariant::Minify).apply(SOURCE).unwrap();
        assert!(out.len() < SOURCE.len());
        assert!(out.contains("alert("));
    }

    #[test]
    fn test_compress_shrinks() {
        let out = OxcTransform::new(MinifierVariant::Compress).apply(SOURCE).unwrap();
        assert!(out.len() < SOURCE.len());
        assert!(out.contains("alert("));
    }

    #[test]
    fn test_beautify_keeps_names() {
        let out = OxcTransform::new(MinifierVariant::Beautify).apply(SOURCE).unwrap();
        assert!(out.contains("function greet(name)"));
        assert!(out.contains('\n'));
    }

    #[test]
    fn test_beautify_is_fixed_point() {
        let transform = OxcTransform::new(MinifierVariant::Beautify);
        let once = transform.apply(SOURCE).unwrap();
        let twice = transform.apply(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_syntax_error() {
        let err = OxcTransform::new(MinifierVariant::Minify)
            .apply("function (")
            .unwrap_err();
        assert!(!err.0.is_empty());
    }

    #[test]
    fn test_variant_aliases() {
        #[derive(Deserialize)]
        struct Wrapper {
            processor: MinifierVariant,
        }
        let parse = |s: &str| {
            toml::from_str::<Wrapper>(&format!("processor = \"{s}\""))
                .unwrap()
                .processor
        };
        assert_eq!(parse("UglifyJs"), MinifierVariant::Minify);
        assert_eq!(parse("BeautifyJs"), MinifierVariant::Beautify);
        assert_eq!(parse("GoogleClosure"), MinifierVariant::Compress);
        assert_eq!(parse("compress"), MinifierVariant::Compress);
    }

    struct Upper;

    impl TextTransform for Upper {
        fn apply(&self, source: &str) -> Result<String, TransformError> {
            Ok(source.to_uppercase())
        }
    }

    struct Failing;

    impl TextTransform for Failing {
        fn apply(&self, _: &str) -> Result<String, TransformError> {
            Err(TransformError("nope".into()))
        }
    }

    #[test]
    fn test_adapter_concatenates_raw() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "a();\n").unwrap();
        fs::write(dir.path().join("b.js"), "  b();").unwrap();

        let minifier = Minifier::with_transform(dir.path(), Upper);
        let out = minifier.minify(&["/a.js".into(), "b.js".into()]).unwrap();
        assert_eq!(out, b"A();\n  B();");
    }

    #[test]
    fn test_adapter_reports_failing_source() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "a();").unwrap();

        let err = Minifier::with_transform(dir.path(), Failing)
            .minify(&["a.js".into()])
            .unwrap_err();
        match err {
            PipelineError::Transform { path, message } => {
                assert_eq!(path, dir.path().join("a.js"));
                assert_eq!(message, "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
