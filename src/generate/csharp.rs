use crate::collect::{Accumulator, Collected, escape};

use super::output::Output;
use super::{GenerateOptions, GenerateResult, Generator, Variant};

pub const DEFAULT_CLASS_NAME: &str = "GeneratedTextTransformation";

pub(crate) const GENERATED_CODE_ATTRIBUTE: &str = concat!(
    "[global::System.CodeDom.Compiler.GeneratedCodeAttribute(\"",
    env!("CARGO_PKG_NAME"),
    "\", \"",
    env!("CARGO_PKG_VERSION"),
    "\")]"
);

const RUNTIME_BASE_CLASS: &str = "global::Microsoft.VisualStudio.TextTemplating.TextTransformation";

const HOST_PROPERTY: &str = "        public virtual global::Microsoft.VisualStudio.TextTemplating.ITextTemplatingEngineHost Host { get; set; }\n";

const RETURN_BUFFER: &str = "            return this.GenerationEnvironment.ToString();\n";

/// Members of the synthesized base class, enough for the transform method to run.
const BASE_CLASS_BODY: &str = r#"    {
        private global::System.Text.StringBuilder generationEnvironmentField;
        private global::System.Collections.Generic.IDictionary<string, object> sessionField;
        private ToStringInstanceHelper toStringHelperField = new ToStringInstanceHelper();

        protected global::System.Text.StringBuilder GenerationEnvironment
        {
            get
            {
                if (this.generationEnvironmentField == null)
                {
                    this.generationEnvironmentField = new global::System.Text.StringBuilder();
                }
                return this.generationEnvironmentField;
            }
            set { this.generationEnvironmentField = value; }
        }

        public virtual global::System.Collections.Generic.IDictionary<string, object> Session
        {
            get { return this.sessionField; }
            set { this.sessionField = value; }
        }

        public ToStringInstanceHelper ToStringHelper
        {
            get { return this.toStringHelperField; }
        }

        public void Write(string textToAppend)
        {
            if (string.IsNullOrEmpty(textToAppend))
            {
                return;
            }
            this.GenerationEnvironment.Append(textToAppend);
        }

        public void WriteLine(string textToAppend)
        {
            this.Write(textToAppend);
            this.GenerationEnvironment.AppendLine();
        }

        public class ToStringInstanceHelper
        {
            private global::System.IFormatProvider formatProviderField = global::System.Globalization.CultureInfo.InvariantCulture;

            public global::System.IFormatProvider FormatProvider
            {
                get { return this.formatProviderField; }
                set
                {
                    if (value != null)
                    {
                        this.formatProviderField = value;
                    }
                }
            }

            public string ToStringWithCulture(object objectToConvert)
            {
                if (objectToConvert == null)
                {
                    throw new global::System.ArgumentNullException("objectToConvert");
                }
                global::System.Type t = objectToConvert.GetType();
                global::System.Reflection.MethodInfo method = t.GetMethod("ToString", new global::System.Type[] { typeof(global::System.IFormatProvider) });
                if (method == null)
                {
                    return objectToConvert.ToString();
                }
                return (string)method.Invoke(objectToConvert, new object[] { this.formatProviderField });
            }
        }
    }
"#;

/// Reserved C# keywords; identifiers spelled like these need an `@` prefix.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

pub fn is_keyword(identifier: &str) -> bool {
    KEYWORDS.contains(&identifier)
}

/// Renders collected sections into one C# compilation unit.
pub struct CSharpGenerator {
    variant: Variant,
}

impl CSharpGenerator {
    pub fn new(variant: Variant) -> Self {
        Self { variant }
    }

    fn emit_class(
        &self,
        sections: &Accumulator,
        class_name: &str,
        base_name: &str,
        output: &mut Output,
    ) {
        output.push(&format!("    {}\n", GENERATED_CODE_ATTRIBUTE));
        output.push(&format!("    public class {} : ", class_name));
        if sections.has_base_class() {
            output.push_section(&sections.base_class);
        } else {
            output.push(base_name);
        }
        output.newline();
        output.push("    {\n");

        if sections.requires_host() {
            output.push(HOST_PROPERTY);
        }

        output.push_section(&sections.parameters);

        if self.variant.emits_initializer() && !sections.parameter_descriptions.is_empty() {
            self.emit_initializer(sections, output);
        }

        // The runtime base declares the method abstract; a user base is assumed to as well.
        let modifier = if sections.has_base_class() || self.variant == Variant::CodeBehind {
            "override"
        } else {
            "virtual"
        };
        output.push(&format!("        public {} string TransformText()\n", modifier));
        output.push("        {\n");
        let body_start = output.position();
        let body_line = output.line();
        output.push_section(&sections.transformation);
        debug_assert_eq!(
            output.line() - body_line,
            sections.transformation_lines(),
            "transformation line count out of sync with the emitted body"
        );
        tracing::trace!(
            offset = body_start,
            line = body_line,
            lines = sections.transformation_lines(),
            "emitted transform body"
        );
        if !sections.transformation.ends_with_newline() {
            output.newline();
        }
        output.push(RETURN_BUFFER);
        output.push("        }\n");

        output.push_section(&sections.feature);
        if !sections.feature.ends_with_newline() {
            output.newline();
        }
        output.push("    }\n");
    }

    /// Copies parameter values out of the session dictionary.
    fn emit_initializer(&self, sections: &Accumulator, output: &mut Output) {
        output.push("        public virtual void Initialize()\n");
        output.push("        {\n");
        output.push("            if (this.Session != null)\n");
        output.push("            {\n");
        output.push("                object value;\n");
        for parameter in &sections.parameter_descriptions {
            let member = if is_keyword(&parameter.name) {
                format!("@{}", parameter.name)
            } else {
                parameter.name.clone()
            };
            output.push(&format!(
                "                if (this.Session.TryGetValue(\"{}\", out value)) this.{} = ({})value;\n",
                escape(&parameter.name),
                member,
                parameter.type_name
            ));
        }
        output.push("            }\n");
        output.push("        }\n");
    }
}

impl Generator for CSharpGenerator {
    fn generate(&self, collected: Collected, options: &GenerateOptions) -> GenerateResult {
        let Collected {
            sections,
            problems,
            references,
            output_extension,
        } = collected;

        let class_name = options.class_name();
        let synthesized_base = format!("{}Base", class_name);
        let base_name = if self.variant.synthesizes_base_class() {
            synthesized_base.as_str()
        } else {
            RUNTIME_BASE_CLASS
        };

        let mut output = Output::new();
        let namespace = options.namespace();

        if let Some(namespace) = namespace {
            output.push(&format!("namespace {}\n{{\n", namespace));
        }

        output.push("using System;\n");
        output.push_section(&sections.imports);
        output.newline();

        self.emit_class(&sections, class_name, base_name, &mut output);

        if !sections.has_base_class() && self.variant.synthesizes_base_class() {
            output.newline();
            output.push(&format!("    public class {}\n", synthesized_base));
            output.push(BASE_CLASS_BODY);
        }

        if namespace.is_some() {
            output.push("}\n");
        }

        let (code, projections) = output.finish();
        tracing::debug!(
            variant = ?self.variant,
            bytes = code.len(),
            projections = projections.len(),
            "assembled program"
        );

        GenerateResult {
            code,
            projections,
            problems,
            references,
            output_extension,
        }
    }
}
