//! Properties every generation must satisfy, checked over fixture bundles and a few
//! programmatic templates, for every program variant.
//!
//! Run with: cargo test --test invariants

use std::path::Path;
use std::sync::Arc;

use libtest_mimic::{Arguments, Failed, Trial};
use tea_transpiler::collect::unescape;
use tea_transpiler::{
    GenerateOptions, GenerateResult, Node, ProjectionKind, TemplateBuilder, TemplateBundle,
    Variant, generate_bundle,
};

const VARIANTS: [Variant; 3] = [Variant::CodeBehind, Variant::Executable, Variant::Interactive];

struct Case {
    name: String,
    bundle: Arc<TemplateBundle>,
}

fn fixture_cases() -> Vec<Case> {
    let pattern = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/*.bundle.json")
        .display()
        .to_string();

    let mut cases = Vec::new();
    for path in glob::glob(&pattern).expect("valid glob pattern").filter_map(Result::ok) {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_suffix(".bundle.json"))
            .unwrap_or("fixture")
            .to_string();
        let bundle = TemplateBundle::load(&path)
            .unwrap_or_else(|err| panic!("{}: {}", path.display(), err));
        cases.push(Case {
            name,
            bundle: Arc::new(bundle),
        });
    }
    cases.sort_by(|a, b| a.name.cmp(&b.name));
    cases
}

fn builder_cases() -> Vec<Case> {
    let empty = TemplateBuilder::new("empty.tt").build();

    let text_only = TemplateBuilder::new("text.tt")
        .text("line one\nline \"two\"\r\n\ttabbed \\ slash\n")
        .build();

    let adjacent = TemplateBuilder::new("adjacent.tt")
        .text("a")
        .text("")
        .text("b\n")
        .expression("x")
        .expression("y")
        .text("\n")
        .build();

    let features = TemplateBuilder::new("features.tt")
        .feature(" int a; ")
        .text("after feature\n")
        .expression(" a ")
        .statement(" a++; ")
        .feature(" int b; ")
        .build();

    let unicode = TemplateBuilder::new("unicode.tt")
        .directive("import", &[("namespace", "Ünïcode.Names")])
        .text("naïve — 日本語 \u{2028} 👋\n")
        .expression(" \"ß\" ")
        .build();

    [empty, text_only, adjacent, features, unicode]
        .into_iter()
        .map(|tree| Case {
            name: tree
                .source
                .as_str()
                .trim_end_matches(".tt")
                .to_string(),
            bundle: Arc::new(TemplateBundle::new(tree)),
        })
        .collect()
}

fn compile(bundle: &TemplateBundle, variant: Variant) -> Result<GenerateResult, Failed> {
    let options = GenerateOptions {
        variant,
        ..GenerateOptions::default()
    };
    generate_bundle(bundle, &options).map_err(|err| Failed::from(err.to_string()))
}

/// Generated ranges strictly increase and never overlap.
fn check_monotonic(bundle: &TemplateBundle, variant: Variant) -> Result<(), Failed> {
    let result = compile(bundle, variant)?;
    let mut previous_end = 0;
    for projection in &result.projections {
        if projection.generated.is_empty() || projection.original.is_empty() {
            return Err(format!("empty projection: {:?}", projection).into());
        }
        if projection.generated.start < previous_end {
            return Err(format!(
                "projection {:?} starts before previous end {}",
                projection.generated, previous_end
            )
            .into());
        }
        previous_end = projection.generated.end;
    }
    if previous_end > result.code.len() {
        return Err("projection past end of generated code".into());
    }
    Ok(())
}

/// Code projections are verbatim; text projections unescape to the original.
fn check_projected_text(bundle: &TemplateBundle, variant: Variant) -> Result<(), Failed> {
    let result = compile(bundle, variant)?;
    for projection in &result.projections {
        let tree = bundle
            .get(&projection.source)
            .ok_or_else(|| format!("unknown source {}", projection.source))?;
        let original = tree
            .slice(projection.original)
            .ok_or_else(|| format!("invalid original range {:?}", projection.original))?;
        let generated = result
            .code
            .get(projection.generated.start..projection.generated.end)
            .ok_or_else(|| format!("invalid generated range {:?}", projection.generated))?;

        let matches = match projection.kind {
            ProjectionKind::Code => generated == original,
            ProjectionKind::Text => unescape(generated) == original,
        };
        if !matches {
            return Err(format!(
                "{:?} projection mismatch: generated {:?}, original {:?}",
                projection.kind, generated, original
            )
            .into());
        }

        let line = result.code[..projection.generated.start].matches('\n').count();
        if line != projection.generated_line {
            return Err(format!(
                "projection at {} reports line {}, actual {}",
                projection.generated.start, projection.generated_line, line
            )
            .into());
        }
    }
    Ok(())
}

fn check_idempotent(bundle: &TemplateBundle, variant: Variant) -> Result<(), Failed> {
    let first = compile(bundle, variant)?;
    let second = compile(bundle, variant)?;
    if first.code != second.code || first.projections != second.projections {
        return Err("repeated generation differs".into());
    }
    if first.problems != second.problems {
        return Err("repeated generation reports different problems".into());
    }
    Ok(())
}

/// Decoding the literal statements in order reproduces the template's text nodes.
fn check_literal_roundtrip(bundle: &TemplateBundle, variant: Variant) -> Result<(), Failed> {
    let result = compile(bundle, variant)?;
    let root = bundle.root_tree().map_err(|err| Failed::from(err.to_string()))?;

    let expected: String = root
        .nodes
        .iter()
        .filter_map(|node| match node {
            Node::Text(text) => Some(text.content.as_str()),
            _ => None,
        })
        .collect();
    let decoded: String = result
        .projections
        .iter()
        .filter(|projection| projection.kind == ProjectionKind::Text)
        .map(|projection| {
            unescape(&result.code[projection.generated.start..projection.generated.end])
        })
        .collect();

    if decoded != expected {
        return Err(format!("decoded {:?}, expected {:?}", decoded, expected).into());
    }
    Ok(())
}

/// Every problem points at a valid range of a known source.
fn check_problem_ranges(bundle: &TemplateBundle, variant: Variant) -> Result<(), Failed> {
    let result = compile(bundle, variant)?;
    for problem in &result.problems {
        let tree = bundle
            .get(&problem.source)
            .ok_or_else(|| format!("problem in unknown source {}", problem.source))?;
        if tree.slice(problem.span).is_none_or(str::is_empty) {
            return Err(format!("problem range {:?} is empty or invalid", problem.span).into());
        }
    }
    Ok(())
}

fn main() {
    let args = Arguments::from_args();

    let checks: [(&str, fn(&TemplateBundle, Variant) -> Result<(), Failed>); 4] = [
        ("monotonic", check_monotonic),
        ("projected_text", check_projected_text),
        ("idempotent", check_idempotent),
        ("problem_ranges", check_problem_ranges),
    ];

    let mut trials = Vec::new();
    for case in fixture_cases().into_iter().chain(builder_cases()) {
        for variant in VARIANTS {
            for (check_name, check) in checks {
                let bundle = Arc::clone(&case.bundle);
                trials.push(Trial::test(
                    format!("{}::{:?}::{}", case.name, variant, check_name),
                    move || check(&bundle, variant),
                ));
            }

            // Includes interleave other sources' text.
            if case.bundle.templates.len() == 1 {
                let bundle = Arc::clone(&case.bundle);
                trials.push(Trial::test(
                    format!("{}::{:?}::literal_roundtrip", case.name, variant),
                    move || check_literal_roundtrip(&bundle, variant),
                ));
            }
        }
    }

    libtest_mimic::run(&args, trials).exit();
}
