//! The schema model built by the parser and read by the code generators.
//!
//! `ProtoModel` owns every entity parsed out of one `.proto` file. Message
//! nesting is represented with an arena: all messages live in one vector
//! and parents refer to children by index, so the parse-time cursor stack
//! and the generator's tree walk never contend over ownership. After
//! parsing returns the model is read-only; all mutation operations are
//! crate-private and used only by the parser.

use std::path::Path;

use crate::error::{Error, Result};
use crate::ident::to_pascal;

/// Index of a message in the model's arena.
pub type MessageIndex = usize;

/// Built-in scalar type keywords of the proto2 dialect.
pub const BUILT_IN_TYPES: &[&str] = &[
    "bool", "string", "bytes", "double", "float", "int32", "int64", "uint32", "uint64", "sint32",
    "sint64", "fixed32", "fixed64", "sfixed32", "sfixed64",
];

/// Visibility of an `import` statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportVisibility {
    Normal,
    Public,
    Weak,
}

#[derive(Clone, Debug)]
pub struct ImportModel {
    path: String,
    visibility: ImportVisibility,
}

impl ImportModel {
    pub(crate) fn new(path: impl Into<String>, visibility: ImportVisibility) -> ImportModel {
        ImportModel {
            path: path.into(),
            visibility,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn visibility(&self) -> ImportVisibility {
        self.visibility
    }
}

/// Whether a field is required, optional, or repeated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requiredness {
    Required,
    Optional,
    Repeated,
}

/// The coarse kind of a field's type, determined after parsing; it selects
/// the accessor shape and the backing wrapper the generator emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldCategory {
    Bool,
    Numeric,
    Enum,
    String,
    Bytes,
    Message,
}

#[derive(Clone, Debug)]
pub struct EnumValueModel {
    name: String,
    value: i32,
}

impl EnumValueModel {
    pub(crate) fn new(name: impl Into<String>, value: i32) -> EnumValueModel {
        EnumValueModel {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> i32 {
        self.value
    }
}

#[derive(Clone, Debug)]
pub struct EnumModel {
    name: String,
    package: String,
    values: Vec<EnumValueModel>,
}

impl EnumModel {
    pub(crate) fn new(name: impl Into<String>, package: impl Into<String>) -> EnumModel {
        EnumModel {
            name: name.into(),
            package: package.into(),
            values: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_pascal(&self) -> String {
        to_pascal(&self.name)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn values(&self) -> &[EnumValueModel] {
        &self.values
    }
}

#[derive(Clone, Debug)]
pub struct MessageFieldModel {
    requiredness: Requiredness,
    field_type: String,
    field_type_package: String,
    resolved_type: String,
    name: String,
    index: u32,
    default_value: Option<String>,
    category: Option<FieldCategory>,
}

impl MessageFieldModel {
    pub(crate) fn new(
        requiredness: Requiredness,
        field_type: impl Into<String>,
        name: impl Into<String>,
        index: u32,
    ) -> MessageFieldModel {
        MessageFieldModel {
            requiredness,
            field_type: field_type.into(),
            field_type_package: String::new(),
            resolved_type: String::new(),
            name: name.into(),
            index,
            default_value: None,
            category: None,
        }
    }

    pub fn requiredness(&self) -> Requiredness {
        self.requiredness
    }

    /// The type exactly as written in the source: a built-in keyword or a
    /// dotted user-type reference.
    pub fn field_type(&self) -> &str {
        &self.field_type
    }

    /// The dotted package of the referenced user type; empty for built-in
    /// types and until categories have been assigned.
    pub fn field_type_package(&self) -> &str {
        &self.field_type_package
    }

    /// The referenced type's full dotted path within its package, e.g.
    /// `palette.swatch` for a bare `swatch` reference to a nested message.
    /// Empty for built-in types and until categories have been assigned.
    pub fn resolved_type_path(&self) -> &str {
        &self.resolved_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_pascal(&self) -> String {
        to_pascal(&self.name)
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn category(&self) -> Option<FieldCategory> {
        self.category
    }
}

#[derive(Clone, Debug)]
pub struct OneofModel {
    name: String,
    package: String,
    fields: Vec<MessageFieldModel>,
}

impl OneofModel {
    pub(crate) fn new(name: impl Into<String>, package: impl Into<String>) -> OneofModel {
        OneofModel {
            name: name.into(),
            package: package.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_pascal(&self) -> String {
        to_pascal(&self.name)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn fields(&self) -> &[MessageFieldModel] {
        &self.fields
    }
}

#[derive(Clone, Debug)]
pub struct MessageModel {
    name: String,
    package: String,
    fields: Vec<MessageFieldModel>,
    messages: Vec<MessageIndex>,
    enums: Vec<EnumModel>,
    oneofs: Vec<OneofModel>,
}

impl MessageModel {
    pub(crate) fn new(name: impl Into<String>, package: impl Into<String>) -> MessageModel {
        MessageModel {
            name: name.into(),
            package: package.into(),
            fields: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
            oneofs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_pascal(&self) -> String {
        to_pascal(&self.name)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Direct fields, excluding oneof members, in declaration order.
    pub fn fields(&self) -> &[MessageFieldModel] {
        &self.fields
    }

    /// Arena indices of nested messages in declaration order.
    pub fn nested_messages(&self) -> &[MessageIndex] {
        &self.messages
    }

    pub fn enums(&self) -> &[EnumModel] {
        &self.enums
    }

    pub fn oneofs(&self) -> &[OneofModel] {
        &self.oneofs
    }
}

/// Locator for the field most recently added and not yet completed.
#[derive(Clone, Copy, Debug)]
enum FieldCursor {
    Direct(MessageIndex),
    Oneof(MessageIndex),
}

/// Locator for the enum currently being populated with values.
#[derive(Clone, Copy, Debug)]
enum EnumCursor {
    TopLevel,
    Message(MessageIndex),
}

/// The parsed representation of one `.proto` file.
#[derive(Debug)]
pub struct ProtoModel {
    file_name: String,
    package: String,
    imports: Vec<ImportModel>,
    enums: Vec<EnumModel>,
    messages: Vec<MessageIndex>,
    arena: Vec<MessageModel>,
    // Parse-time cursors; all cleared by the time parsing returns.
    message_stack: Vec<MessageIndex>,
    open_oneof: Option<MessageIndex>,
    open_enum: Option<EnumCursor>,
    current_field: Option<FieldCursor>,
}

impl ProtoModel {
    pub(crate) fn new(file_name: impl Into<String>) -> ProtoModel {
        ProtoModel {
            file_name: file_name.into(),
            package: String::new(),
            imports: Vec::new(),
            enums: Vec::new(),
            messages: Vec::new(),
            arena: Vec::new(),
            message_stack: Vec::new(),
            open_oneof: None,
            open_enum: None,
            current_field: None,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Pascal form of the source file's stem, used to name the generated
    /// output files and the include guard.
    pub fn name_pascal(&self) -> String {
        let stem = Path::new(&self.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        to_pascal(&stem)
    }

    /// The package most recently set with a `package` statement.
    pub fn current_package(&self) -> &str {
        &self.package
    }

    pub fn imports(&self) -> &[ImportModel] {
        &self.imports
    }

    /// Top-level enums in declaration order.
    pub fn enums(&self) -> &[EnumModel] {
        &self.enums
    }

    /// Top-level messages in declaration order.
    pub fn messages(&self) -> impl Iterator<Item = &MessageModel> {
        self.messages.iter().map(|&index| &self.arena[index])
    }

    /// Resolves a nested-message index produced by
    /// [`MessageModel::nested_messages`].
    pub fn message(&self, index: MessageIndex) -> &MessageModel {
        &self.arena[index]
    }

    pub(crate) fn has_open_messages(&self) -> bool {
        !self.message_stack.is_empty()
    }

    pub(crate) fn set_current_package(&mut self, package: impl Into<String>) {
        self.package = package.into();
    }

    pub(crate) fn add_import(&mut self, import: ImportModel) {
        self.imports.push(import);
    }

    pub(crate) fn add_enum(&mut self, enumeration: EnumModel) {
        match self.message_stack.last() {
            Some(&top) => {
                self.arena[top].enums.push(enumeration);
                self.open_enum = Some(EnumCursor::Message(top));
            }
            None => {
                self.enums.push(enumeration);
                self.open_enum = Some(EnumCursor::TopLevel);
            }
        }
    }

    pub(crate) fn add_enum_value(&mut self, value: EnumValueModel) -> std::result::Result<(), String> {
        let open = match self.open_enum {
            Some(EnumCursor::TopLevel) => self.enums.last_mut(),
            Some(EnumCursor::Message(index)) => self.arena[index].enums.last_mut(),
            None => None,
        };
        match open {
            Some(enumeration) => {
                enumeration.values.push(value);
                Ok(())
            }
            None => Err("enum value added outside of an enum".to_string()),
        }
    }

    pub(crate) fn complete_enum(&mut self) {
        self.open_enum = None;
    }

    /// Adds a message to the innermost open message, or to the file when no
    /// message is open, and makes it the innermost open message.
    pub(crate) fn add_message(&mut self, message: MessageModel) {
        let index = self.arena.len();
        self.arena.push(message);
        match self.message_stack.last() {
            Some(&top) => self.arena[top].messages.push(index),
            None => self.messages.push(index),
        }
        self.message_stack.push(index);
    }

    pub(crate) fn complete_message(&mut self) -> std::result::Result<(), String> {
        match self.message_stack.pop() {
            Some(_) => Ok(()),
            None => Err("mismatched } with no open message".to_string()),
        }
    }

    pub(crate) fn add_oneof(&mut self, oneof: OneofModel) -> std::result::Result<(), String> {
        match self.message_stack.last() {
            Some(&top) => {
                self.arena[top].oneofs.push(oneof);
                self.open_oneof = Some(top);
                Ok(())
            }
            None => Err("oneof declared outside of a message".to_string()),
        }
    }

    pub(crate) fn complete_oneof(&mut self) {
        self.open_oneof = None;
    }

    /// Attaches a field to the open oneof when one is set, otherwise to the
    /// innermost open message. The field stays current until
    /// [`ProtoModel::complete_field`] so that option parsers can adjust it.
    pub(crate) fn add_field(&mut self, field: MessageFieldModel) -> std::result::Result<(), String> {
        if let Some(index) = self.open_oneof {
            self.arena[index]
                .oneofs
                .last_mut()
                .expect("open oneof with no oneof in message")
                .fields
                .push(field);
            self.current_field = Some(FieldCursor::Oneof(index));
            return Ok(());
        }
        match self.message_stack.last() {
            Some(&top) => {
                self.arena[top].fields.push(field);
                self.current_field = Some(FieldCursor::Direct(top));
                Ok(())
            }
            None => Err("field declared outside of a message".to_string()),
        }
    }

    pub(crate) fn complete_field(&mut self) {
        self.current_field = None;
    }

    fn current_field_mut(&mut self) -> Option<&mut MessageFieldModel> {
        match self.current_field? {
            FieldCursor::Direct(index) => self.arena[index].fields.last_mut(),
            FieldCursor::Oneof(index) => self.arena[index]
                .oneofs
                .last_mut()
                .and_then(|oneof| oneof.fields.last_mut()),
        }
    }

    pub(crate) fn set_default_value(&mut self, value: impl Into<String>) -> std::result::Result<(), String> {
        match self.current_field_mut() {
            Some(field) => {
                field.default_value = Some(value.into());
                Ok(())
            }
            None => Err("default value with no field being parsed".to_string()),
        }
    }

    /// Assigns every field its category, resolving user-type references
    /// against the enums and messages declared in this model. Must run after
    /// parsing and before generation.
    pub(crate) fn assign_field_categories(&mut self) -> Result<()> {
        let symbols = self.collect_symbols();

        for message in &mut self.arena {
            for field in message
                .fields
                .iter_mut()
                .chain(message.oneofs.iter_mut().flat_map(|o| o.fields.iter_mut()))
            {
                if let Some(category) = built_in_category(&field.field_type) {
                    field.category = Some(category);
                    continue;
                }
                match symbols.resolve(&field.field_type) {
                    Some((category, package, path)) => {
                        field.category = Some(category);
                        field.field_type_package = package.to_string();
                        field.resolved_type = path;
                    }
                    None => {
                        return Err(Error::Schema(format!(
                            "unknown field type '{}' for field '{}'",
                            field.field_type, field.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walks the model and records the fully qualified dotted name and the
    /// package of every enum and message.
    fn collect_symbols(&self) -> SymbolTable {
        fn qualify(prefix: &str, name: &str) -> String {
            if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{}.{}", prefix, name)
            }
        }

        let mut table = SymbolTable::default();
        for enumeration in &self.enums {
            table.enums.push((
                qualify(&enumeration.package, &enumeration.name),
                enumeration.package.clone(),
            ));
        }
        let mut pending: Vec<(MessageIndex, String)> = self
            .messages
            .iter()
            .map(|&index| {
                let message = &self.arena[index];
                (index, qualify(&message.package, &message.name))
            })
            .collect();
        while let Some((index, path)) = pending.pop() {
            let message = &self.arena[index];
            for enumeration in &message.enums {
                table
                    .enums
                    .push((qualify(&path, &enumeration.name), message.package.clone()));
            }
            for &nested in &message.messages {
                pending.push((nested, qualify(&path, &self.arena[nested].name)));
            }
            table.messages.push((path, message.package.clone()));
        }
        table
    }
}

#[derive(Default)]
struct SymbolTable {
    enums: Vec<(String, String)>,
    messages: Vec<(String, String)>,
}

impl SymbolTable {
    /// Resolves a type reference as written in the source. Enums win over
    /// messages; a reference matches on the full dotted path or on a suffix
    /// at a dot boundary. Returns the category, the match's package, and
    /// the match's dotted path within that package.
    fn resolve(&self, reference: &str) -> Option<(FieldCategory, &str, String)> {
        let matches = |path: &str| {
            path == reference || path.ends_with(&format!(".{}", reference))
        };
        let relative = |path: &str, package: &str| {
            if package.is_empty() {
                path.to_string()
            } else {
                path.strip_prefix(&format!("{}.", package))
                    .unwrap_or(path)
                    .to_string()
            }
        };
        if let Some((path, package)) = self.enums.iter().find(|(path, _)| matches(path)) {
            return Some((FieldCategory::Enum, package, relative(path, package)));
        }
        if let Some((path, package)) = self.messages.iter().find(|(path, _)| matches(path)) {
            return Some((FieldCategory::Message, package, relative(path, package)));
        }
        None
    }
}

fn built_in_category(field_type: &str) -> Option<FieldCategory> {
    match field_type {
        "bool" => Some(FieldCategory::Bool),
        "string" => Some(FieldCategory::String),
        "bytes" => Some(FieldCategory::Bytes),
        "double" | "float" | "int32" | "int64" | "uint32" | "uint64" | "sint32" | "sint64"
        | "fixed32" | "fixed64" | "sfixed32" | "sfixed64" => Some(FieldCategory::Numeric),
        _ => None,
    }
}
