//! End-to-end behavior of the collect-then-assemble pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tea_transpiler::{
    CancellationFlag, GenerateError, GenerateOptions, NoIncludes, Pipeline, ProblemKind,
    ProjectionKind, TemplateBuilder, TemplateBundle, Variant, generate, generate_bundle,
};

#[test]
fn test_import_and_literal_line() {
    let tree = TemplateBuilder::new("hello.tt")
        .directive("import", &[("namespace", "System.Text")])
        .text("Hello")
        .build();
    let result = Pipeline::standard().compile(&tree, &NoIncludes).unwrap();

    assert_eq!(result.code.matches("using System.Text;\n").count(), 1);
    assert_eq!(result.code.matches("this.Write(").count(), 1);
    assert!(result.code.contains("this.Write(\"Hello\");\n"));

    // The namespace maps back onto the attribute value.
    let offset = result.code.find("System.Text").unwrap();
    let projection = result.lookup_by_generated(offset).unwrap();
    assert_eq!(projection.kind, ProjectionKind::Code);
    assert_eq!(tree.slice(projection.original), Some("System.Text"));

    let offset = result.code.find("Hello").unwrap();
    let projection = result.lookup_by_generated(offset).unwrap();
    assert_eq!(projection.kind, ProjectionKind::Text);
    assert_eq!(tree.slice(projection.original), Some("Hello"));
    assert!(!result.has_problems());
}

#[test]
fn test_direct_include_cycle() {
    let root = TemplateBuilder::new("root.tt")
        .text("root start\n")
        .include("x.tt")
        .text("root end\n")
        .build();
    let x = TemplateBuilder::new("x.tt")
        .text("in x\n")
        .include("root.tt")
        .build();
    let bundle = TemplateBundle::new(root).with_template(x);

    let result = generate_bundle(&bundle, &GenerateOptions::default()).unwrap();

    let cycles: Vec<_> = result.problems_of(ProblemKind::CyclicInclude).collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].source.as_str(), "x.tt");
    assert_eq!(result.problems.len(), 1);
    assert!(result.is_interrupted());

    let start = result.code.find("root start").unwrap();
    let middle = result.code.find("in x").unwrap();
    let end = result.code.find("root end").unwrap();
    assert!(start < middle && middle < end);
}

#[test]
fn test_parameter_with_empty_type() {
    let tree = TemplateBuilder::new("params.tt")
        .directive("parameter", &[("type", ""), ("name", "Foo")])
        .build();

    for variant in [Variant::CodeBehind, Variant::Executable, Variant::Interactive] {
        let options = GenerateOptions {
            variant,
            ..GenerateOptions::default()
        };
        let result = generate(&tree, &NoIncludes, &options).unwrap();

        assert!(!result.code.contains("Foo"), "{:?}", variant);
        assert!(!result.code.contains("Initialize()"), "{:?}", variant);
        let malformed: Vec<_> = result.problems_of(ProblemKind::MalformedDirective).collect();
        assert_eq!(malformed.len(), 1);
        assert!(!result.is_interrupted());
    }
}

#[test]
fn test_cancellation_after_first_directive() {
    let tree = TemplateBuilder::new("cancel.tt")
        .directive("import", &[("namespace", "A")])
        .directive("import", &[("namespace", "B")])
        .directive("import", &[("namespace", "C")])
        .build();

    let checks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&checks);
    let pipeline = Pipeline::standard()
        .with_cancellation(Arc::new(move || counter.fetch_add(1, Ordering::SeqCst) >= 1));

    let result = pipeline.compile(&tree, &NoIncludes);
    assert_eq!(result.err(), Some(GenerateError::Aborted));
    assert_eq!(checks.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cancellation_inside_include() {
    let root = TemplateBuilder::new("root.tt")
        .include("big.tt")
        .text("never reached")
        .build();
    let big = TemplateBuilder::new("big.tt")
        .text("a")
        .statement(" b(); ")
        .build();
    let bundle = TemplateBundle::new(root).with_template(big);

    let flag = CancellationFlag::new();
    let trigger = flag.clone();
    let checks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&checks);
    // Cancel while the included tree is being visited.
    let pipeline = Pipeline::standard().with_cancellation(Arc::new(move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 2 {
            trigger.cancel();
        }
        use tea_transpiler::Cancellation;
        flag.is_cancelled()
    }));

    let root = bundle.root_tree().unwrap();
    assert_eq!(pipeline.compile(root, &bundle).err(), Some(GenerateError::Aborted));
    assert_eq!(checks.load(Ordering::SeqCst), 3);
}

#[test]
fn test_first_template_directive_wins_regardless_of_depth() {
    let root = TemplateBuilder::new("root.tt")
        .include("base.ttinclude")
        .directive("template", &[("hostspecific", "false"), ("inherits", "RootBase")])
        .build();
    let included = TemplateBuilder::new("base.ttinclude")
        .directive("template", &[("hostspecific", "true"), ("inherits", "IncludedBase")])
        .build();
    let bundle = TemplateBundle::new(root).with_template(included);

    let result = generate_bundle(&bundle, &GenerateOptions::default()).unwrap();
    assert!(result.code.contains("public class GeneratedTextTransformation : IncludedBase\n"));
    assert!(result.code.contains("ITextTemplatingEngineHost Host"));
    assert!(!result.code.contains("RootBase"));

    let offset = result.code.find("IncludedBase").unwrap();
    let projection = result.lookup_by_generated(offset).unwrap();
    assert_eq!(projection.source.as_str(), "base.ttinclude");
}

#[test]
fn test_section_order() {
    let tree = TemplateBuilder::new("order.tt")
        .feature(" int helper; ")
        .text("body\n")
        .directive("parameter", &[("type", "int"), ("name", "Count")])
        .directive("import", &[("namespace", "System.IO")])
        .directive("template", &[("hostspecific", "true")])
        .build();
    let options = GenerateOptions {
        namespace: Some("Acme".to_string()),
        ..GenerateOptions::default()
    };
    let result = generate(&tree, &NoIncludes, &options).unwrap();

    let positions: Vec<usize> = [
        "namespace Acme",
        "using System;",
        "using System.IO;",
        "public class GeneratedTextTransformation",
        "Host { get; set; }",
        "private int Count { get; private set; }",
        "public override string TransformText()",
        "this.Write(\"body\\n\");",
        "return this.GenerationEnvironment.ToString();",
        " int helper; ",
    ]
    .iter()
    .map(|needle| {
        result
            .code
            .find(needle)
            .unwrap_or_else(|| panic!("missing {:?} in\n{}", needle, result.code))
    })
    .collect();

    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "{}", result.code);
    assert!(result.code.ends_with("    }\n}\n"));
}

#[test]
fn test_output_extension_and_references() {
    let tree = TemplateBuilder::new("refs.tt")
        .directive("output", &[("extension", ".xml")])
        .directive("assembly", &[("name", "$(Lib)/Tools.dll")])
        .directive("assembly", &[("name", "System.Xml")])
        .build();
    let mut options = GenerateOptions::default();
    options.macros.insert("Lib".to_string(), "/opt/lib".to_string());

    let result = generate(&tree, &NoIncludes, &options).unwrap();
    assert_eq!(result.output_extension.as_deref(), Some(".xml"));
    let names: Vec<_> = result.references.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["/opt/lib/Tools.dll", "System.Xml"]);
}

#[test]
fn test_empty_template() {
    let tree = TemplateBuilder::new("empty.tt").build();
    let result = Pipeline::standard().compile(&tree, &NoIncludes).unwrap();
    assert!(result.projections.is_empty());
    assert!(result.code.contains(
        "        public override string TransformText()\n        {\n            return this.GenerationEnvironment.ToString();\n        }\n"
    ));
}

#[test]
fn test_shared_pipeline_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Pipeline>();

    let first = TemplateBundle::new(
        TemplateBuilder::new("first.tt")
            .text("one\n")
            .include("part.tt")
            .build(),
    )
    .with_template(TemplateBuilder::new("part.tt").expression(" Part ").build());
    let second = TemplateBundle::new(
        TemplateBuilder::new("second.tt")
            .directive("import", &[("namespace", "System.IO")])
            .statement(" Two(); ")
            .build(),
    );

    let pipeline = Pipeline::standard();
    let (a, b) = std::thread::scope(|scope| {
        let a = scope.spawn(|| pipeline.compile(first.root_tree().unwrap(), &first));
        let b = scope.spawn(|| pipeline.compile(second.root_tree().unwrap(), &second));
        (a.join().unwrap().unwrap(), b.join().unwrap().unwrap())
    });

    assert!(a.code.contains("ToStringWithCulture( Part )"));
    assert!(!a.code.contains("System.IO"));
    assert!(b.code.contains(" Two(); "));
    assert!(!b.code.contains("Part"));

    // Same output as running one after the other.
    let sequential = pipeline.compile(first.root_tree().unwrap(), &first).unwrap();
    assert_eq!(a.code, sequential.code);
    assert_eq!(a.projections.len(), sequential.projections.len());
}
