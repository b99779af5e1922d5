//! Line-oriented formatter for emitted C++ source text.
//!
//! The writer accumulates generated text in a string buffer and tracks the
//! current indentation depth; callers describe constructs (namespaces,
//! classes, methods, control flow) and the writer renders the braces and
//! indentation. Files are written to disk only after a whole buffer has
//! been produced, so emission itself cannot fail.

const INDENT: &str = "    ";

/// Qualifiers applied to a method declaration.
#[derive(Clone, Copy, Debug, Default)]
pub struct MethodQuals {
    pub is_const: bool,
    pub is_virtual: bool,
    pub is_override: bool,
    pub is_inline: bool,
    pub is_deleted: bool,
}

impl MethodQuals {
    pub fn const_qualified() -> MethodQuals {
        MethodQuals {
            is_const: true,
            ..MethodQuals::default()
        }
    }

    pub fn overriding() -> MethodQuals {
        MethodQuals {
            is_override: true,
            ..MethodQuals::default()
        }
    }

    pub fn const_overriding() -> MethodQuals {
        MethodQuals {
            is_const: true,
            is_override: true,
            ..MethodQuals::default()
        }
    }

    pub fn deleted() -> MethodQuals {
        MethodQuals {
            is_deleted: true,
            ..MethodQuals::default()
        }
    }
}

/// Accumulates one output file's text.
pub struct CodeWriter {
    buf: String,
    depth: usize,
    pending_enum_value: Option<String>,
}

impl CodeWriter {
    pub fn new() -> CodeWriter {
        CodeWriter {
            buf: String::new(),
            depth: 0,
            pending_enum_value: None,
        }
    }

    /// Consumes the writer and returns the accumulated text.
    pub fn into_string(self) -> String {
        self.buf
    }

    fn push_indent(&mut self) {
        for _ in 0..self.depth {
            self.buf.push_str(INDENT);
        }
    }

    /// Writes raw text followed by a newline, without indentation. Used for
    /// prolog blocks and template payloads that carry their own layout.
    pub fn line(&mut self, text: &str) {
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    /// Writes one line at the current indentation.
    pub fn line_indented(&mut self, text: &str) {
        self.push_indent();
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    pub fn blank_line(&mut self) {
        self.buf.push('\n');
    }

    pub fn header_guard_opening(&mut self, name: &str) {
        self.line(&format!("#ifndef {}", name));
        self.line(&format!("#define {}", name));
        self.blank_line();
    }

    pub fn header_guard_closing(&mut self) {
        self.line("#endif");
    }

    pub fn include_library(&mut self, name: &str) {
        self.line(&format!("#include <{}>", name));
    }

    pub fn include_project(&mut self, name: &str) {
        self.line(&format!("#include \"{}\"", name));
    }

    pub fn using_namespace(&mut self, name: &str) {
        self.line(&format!("using namespace {};", name));
    }

    pub fn namespace_opening(&mut self, name: &str) {
        self.line_indented(&format!("namespace {}", name));
        self.open_brace();
    }

    pub fn namespace_closing(&mut self) {
        self.depth -= 1;
        self.line_indented("}");
    }

    pub fn enum_opening(&mut self, name: &str) {
        self.line_indented(&format!("enum class {}", name));
        self.open_brace();
    }

    /// The first value of an enum; later values follow with
    /// [`CodeWriter::enum_value_subsequent`] so the closing brace can elide
    /// the trailing comma.
    pub fn enum_value_first(&mut self, name: &str, value: i32) {
        self.pending_enum_value = Some(format!("{} = {}", name, value));
    }

    pub fn enum_value_subsequent(&mut self, name: &str, value: i32) {
        self.flush_enum_value(",");
        self.pending_enum_value = Some(format!("{} = {}", name, value));
    }

    pub fn enum_closing(&mut self) {
        self.flush_enum_value("");
        self.depth -= 1;
        self.line_indented("};");
        self.blank_line();
    }

    fn flush_enum_value(&mut self, suffix: &str) {
        if let Some(value) = self.pending_enum_value.take() {
            self.line_indented(&format!("{}{}", value, suffix));
        }
    }

    pub fn class_forward_declaration(&mut self, name: &str) {
        self.line_indented(&format!("class {};", name));
    }

    pub fn class_opening(&mut self, name: &str, base: Option<&str>) {
        match base {
            Some(base) => self.line_indented(&format!("class {} : {}", name, base)),
            None => self.line_indented(&format!("class {}", name)),
        }
        self.open_brace();
    }

    pub fn class_closing(&mut self) {
        self.depth -= 1;
        self.line_indented("};");
        self.blank_line();
    }

    /// Access specifiers sit at the indentation of the class itself, one
    /// level out from the members.
    pub fn class_public(&mut self) {
        self.depth -= 1;
        self.line_indented("public:");
        self.depth += 1;
    }

    pub fn class_private(&mut self) {
        self.depth -= 1;
        self.line_indented("private:");
        self.depth += 1;
    }

    pub fn struct_opening(&mut self, name: &str) {
        self.line_indented(&format!("struct {}", name));
        self.open_brace();
    }

    pub fn struct_closing(&mut self) {
        self.depth -= 1;
        self.line_indented("};");
    }

    pub fn typedef(&mut self, original: &str, alias: &str) {
        self.line_indented(&format!("typedef {} {};", original, alias));
    }

    pub fn method_declaration(
        &mut self,
        name: &str,
        return_type: Option<&str>,
        parameters: &str,
        quals: MethodQuals,
    ) {
        let mut text = String::new();
        if quals.is_virtual {
            text.push_str("virtual ");
        }
        if quals.is_inline {
            text.push_str("inline ");
        }
        if let Some(return_type) = return_type {
            text.push_str(return_type);
            text.push(' ');
        }
        text.push_str(name);
        text.push('(');
        text.push_str(parameters);
        text.push(')');
        if quals.is_const {
            text.push_str(" const");
        }
        if quals.is_override {
            text.push_str(" override");
        }
        if quals.is_deleted {
            text.push_str(" = delete");
        }
        text.push(';');
        self.line_indented(&text);
    }

    /// Opens an inline method body in a class declaration, e.g. the empty
    /// virtual destructor.
    pub fn method_inline_opening(&mut self, name: &str, is_const: bool, is_virtual: bool) {
        let mut text = String::new();
        if is_virtual {
            text.push_str("virtual ");
        }
        text.push_str(name);
        text.push_str("()");
        if is_const {
            text.push_str(" const");
        }
        self.line_indented(&text);
        self.open_brace();
    }

    pub fn method_inline_closing(&mut self) {
        self.depth -= 1;
        self.line_indented("}");
    }

    pub fn field_declaration(
        &mut self,
        name: &str,
        field_type: &str,
        value: Option<&str>,
        is_static: bool,
    ) {
        let mut text = String::new();
        if is_static {
            text.push_str("static ");
        }
        text.push_str(field_type);
        text.push(' ');
        text.push_str(name);
        if let Some(value) = value {
            text.push_str(" = ");
            text.push_str(value);
        }
        text.push(';');
        self.line_indented(&text);
    }

    pub fn method_implementation_opening(
        &mut self,
        name: &str,
        return_type: Option<&str>,
        parameters: &str,
        is_const: bool,
    ) {
        let mut text = String::new();
        if let Some(return_type) = return_type {
            text.push_str(return_type);
            text.push(' ');
        }
        text.push_str(name);
        text.push('(');
        text.push_str(parameters);
        text.push(')');
        if is_const {
            text.push_str(" const");
        }
        self.line_indented(&text);
        self.open_brace();
    }

    pub fn constructor_implementation_opening(
        &mut self,
        name: &str,
        parameters: &str,
        initializers: &str,
    ) {
        self.line_indented(&format!("{}({})", name, parameters));
        if !initializers.is_empty() {
            self.line_indented(&format!(": {}", initializers));
        }
        self.open_brace();
    }

    pub fn method_implementation_closing(&mut self) {
        self.depth -= 1;
        self.line_indented("}");
        self.blank_line();
    }

    pub fn if_opening(&mut self, condition: &str) {
        self.line_indented(&format!("if ({})", condition));
        self.open_brace();
    }

    pub fn else_if_opening(&mut self, condition: &str) {
        self.line_indented(&format!("else if ({})", condition));
        self.open_brace();
    }

    pub fn else_opening(&mut self) {
        self.line_indented("else");
        self.open_brace();
    }

    pub fn if_closing(&mut self) {
        self.depth -= 1;
        self.line_indented("}");
    }

    pub fn while_opening(&mut self, condition: &str) {
        self.line_indented(&format!("while ({})", condition));
        self.open_brace();
    }

    pub fn while_closing(&mut self) {
        self.depth -= 1;
        self.line_indented("}");
    }

    pub fn switch_opening(&mut self, expression: &str) {
        self.line_indented(&format!("switch ({})", expression));
        self.open_brace();
    }

    pub fn switch_case_opening(&mut self, expression: &str) {
        self.line_indented(&format!("case {}:", expression));
        self.open_brace();
    }

    pub fn switch_default_case_opening(&mut self) {
        self.line_indented("default:");
        self.open_brace();
    }

    pub fn switch_case_closing(&mut self) {
        self.line_indented("break;");
        self.depth -= 1;
        self.line_indented("}");
    }

    pub fn switch_closing(&mut self) {
        self.depth -= 1;
        self.line_indented("}");
    }

    fn open_brace(&mut self) {
        self.line_indented("{");
        self.depth += 1;
    }
}

impl Default for CodeWriter {
    fn default() -> CodeWriter {
        CodeWriter::new()
    }
}
