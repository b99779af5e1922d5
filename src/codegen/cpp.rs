//! The C++ code generator.
//!
//! Walks a [`ProtoModel`] and emits a declarations header, an
//! implementation source file, and on demand the shared runtime-support
//! header the generated code includes. Nested messages are flattened to
//! `Outer_Inner` class names with ergonomic aliases inside each class;
//! wire-format parse and serialize bodies dispatch on field index and wire
//! type. Output is a deterministic function of the model.

use std::fs;
use std::path::Path;

use itertools::Itertools;
use log::debug;

use crate::error::{Error, Result};
use crate::ident::{package_segments, to_pascal_path};
use crate::model::{
    EnumModel, FieldCategory, MessageFieldModel, MessageModel, OneofModel, ProtoModel, Requiredness,
};

use super::writer::{CodeWriter, MethodQuals};
use super::Generator;

const HEADER_EXTENSION: &str = ".protocol.h";
const SOURCE_EXTENSION: &str = ".protocol.cpp";
const BASE_CLASSES_NAMESPACE: &str = "Protogen";
const BASE_CLASSES_FILE_NAME: &str = "ProtoBase";

const GENERATED_FILE_PROLOG: &str = "\
// This file was generated from a Protocol Buffers schema definition. Do not
// edit it directly; edit the schema and regenerate instead.
//";

const PROTO_BASE_TEMPLATE: &str = include_str!("proto_base.h");

/// Generates C++ message classes from a schema model.
pub struct CppGenerator;

impl Generator for CppGenerator {
    fn generate(
        &self,
        model: &ProtoModel,
        out_dir: &Path,
        project_name: &str,
        common_code: bool,
    ) -> Result<()> {
        validate_categories(model)?;
        fs::create_dir_all(out_dir)?;
        self.generate_header_file(out_dir, model, project_name)?;
        self.generate_source_file(out_dir, model)?;
        if common_code {
            self.generate_common_header(out_dir, project_name)?;
        }
        Ok(())
    }
}

/// Confirms that post-parse enrichment ran; generating from a model with
/// uncategorised fields would emit unresolvable references.
fn validate_categories(model: &ProtoModel) -> Result<()> {
    fn check(model: &ProtoModel, message: &MessageModel) -> Result<()> {
        for field in message
            .fields()
            .iter()
            .chain(message.oneofs().iter().flat_map(|o| o.fields().iter()))
        {
            if field.category().is_none() {
                return Err(Error::Schema(format!(
                    "field '{}' has no category; the model was not enriched after parsing",
                    field.name()
                )));
            }
        }
        for &nested in message.nested_messages() {
            check(model, model.message(nested))?;
        }
        Ok(())
    }
    for message in model.messages() {
        check(model, message)?;
    }
    Ok(())
}

impl CppGenerator {
    fn generate_header_file(
        &self,
        out_dir: &Path,
        model: &ProtoModel,
        project_name: &str,
    ) -> Result<()> {
        debug!("header: {}", model.name_pascal());
        let mut writer = CodeWriter::new();
        writer.line(GENERATED_FILE_PROLOG);
        writer.header_guard_opening(&header_guard_name(&model.name_pascal(), project_name));

        self.write_standard_includes(&mut writer, true);
        self.write_imported_includes(&mut writer, model);
        self.write_enums_to_header(&mut writer, model);
        self.write_messages_to_header(&mut writer, model);

        writer.header_guard_closing();

        let path = out_dir.join(format!("{}{}", model.name_pascal(), HEADER_EXTENSION));
        fs::write(path, writer.into_string())?;
        Ok(())
    }

    fn generate_source_file(&self, out_dir: &Path, model: &ProtoModel) -> Result<()> {
        debug!("source: {}", model.name_pascal());
        let mut writer = CodeWriter::new();
        writer.line(GENERATED_FILE_PROLOG);

        writer.include_project(&format!("{}{}", model.name_pascal(), HEADER_EXTENSION));
        writer.blank_line();
        writer.using_namespace("std");
        writer.blank_line();

        for message in model.messages() {
            self.write_message_to_source(&mut writer, model, message, &message.name_pascal());
        }

        let path = out_dir.join(format!("{}{}", model.name_pascal(), SOURCE_EXTENSION));
        fs::write(path, writer.into_string())?;
        Ok(())
    }

    /// Writes the runtime-support header; its contents come verbatim from
    /// the bundled template.
    fn generate_common_header(&self, out_dir: &Path, project_name: &str) -> Result<()> {
        let mut writer = CodeWriter::new();
        writer.line(GENERATED_FILE_PROLOG);
        writer.header_guard_opening(&common_guard_name(project_name));

        self.write_standard_includes(&mut writer, false);
        writer.line(PROTO_BASE_TEMPLATE);

        writer.header_guard_closing();

        let path = out_dir.join(format!("{}{}", BASE_CLASSES_FILE_NAME, HEADER_EXTENSION));
        fs::write(path, writer.into_string())?;
        Ok(())
    }

    fn write_standard_includes(&self, writer: &mut CodeWriter, include_base: bool) {
        writer.include_library("cstdint");
        writer.include_library("memory");
        writer.include_library("stdexcept");
        writer.include_library("string");
        writer.include_library("type_traits");
        writer.include_library("vector");
        writer.blank_line();

        if include_base {
            writer.include_project(&format!("{}{}", BASE_CLASSES_FILE_NAME, HEADER_EXTENSION));
            writer.blank_line();
        }
    }

    fn write_imported_includes(&self, writer: &mut CodeWriter, model: &ProtoModel) {
        let mut imports_found = false;
        for import in model.imports() {
            imports_found = true;
            let header = Path::new(import.path()).with_extension("protocol.h");
            writer.include_project(&header.to_string_lossy());
        }
        if imports_found {
            writer.blank_line();
        }
    }

    fn write_enums_to_header(&self, writer: &mut CodeWriter, model: &ProtoModel) {
        let mut namespaces = NamespaceTracker::new();
        for enumeration in model.enums() {
            namespaces.switch_to(writer, enumeration.package());
            self.write_enum_to_header(writer, enumeration.name_pascal().as_str(), enumeration);
        }
        namespaces.close(writer);
    }

    fn write_enum_to_header(
        &self,
        writer: &mut CodeWriter,
        enum_name: &str,
        enumeration: &EnumModel,
    ) {
        writer.enum_opening(enum_name);
        let mut first = true;
        for value in enumeration.values() {
            if first {
                writer.enum_value_first(value.name(), value.value());
                first = false;
            } else {
                writer.enum_value_subsequent(value.name(), value.value());
            }
        }
        writer.enum_closing();
    }

    fn write_messages_to_header(&self, writer: &mut CodeWriter, model: &ProtoModel) {
        let mut namespaces = NamespaceTracker::new();

        // Forward declarations first so that message types may refer to one
        // another regardless of declaration order.
        for message in model.messages() {
            namespaces.switch_to(writer, message.package());
            self.write_message_declaration_to_header(writer, model, message, &message.name_pascal());
        }
        writer.blank_line();

        // Nested enums are flattened next so that the classes can alias them.
        for message in model.messages() {
            namespaces.switch_to(writer, message.package());
            self.write_message_enums_to_header(writer, model, message, &message.name_pascal());
        }

        for message in model.messages() {
            namespaces.switch_to(writer, message.package());
            self.write_message_to_header(writer, model, message, &message.name_pascal());
        }
        namespaces.close(writer);
    }

    fn write_message_declaration_to_header(
        &self,
        writer: &mut CodeWriter,
        model: &ProtoModel,
        message: &MessageModel,
        class_name: &str,
    ) {
        for &nested in message.nested_messages() {
            let sub_message = model.message(nested);
            let sub_class_name = format!("{}_{}", class_name, sub_message.name_pascal());
            self.write_message_declaration_to_header(writer, model, sub_message, &sub_class_name);
        }
        writer.class_forward_declaration(class_name);
    }

    fn write_message_enums_to_header(
        &self,
        writer: &mut CodeWriter,
        model: &ProtoModel,
        message: &MessageModel,
        class_name: &str,
    ) {
        for &nested in message.nested_messages() {
            let sub_message = model.message(nested);
            let sub_class_name = format!("{}_{}", class_name, sub_message.name_pascal());
            self.write_message_enums_to_header(writer, model, sub_message, &sub_class_name);
        }
        for enumeration in message.enums() {
            let enum_name = format!("{}_{}", class_name, enumeration.name_pascal());
            self.write_enum_to_header(writer, &enum_name, enumeration);
        }
    }

    fn write_message_to_header(
        &self,
        writer: &mut CodeWriter,
        model: &ProtoModel,
        message: &MessageModel,
        class_name: &str,
    ) {
        debug!("message: {}", class_name);
        let mut sub_message_found = false;
        for &nested in message.nested_messages() {
            sub_message_found = true;
            let sub_message = model.message(nested);
            let sub_class_name = format!("{}_{}", class_name, sub_message.name_pascal());
            self.write_message_to_header(writer, model, sub_message, &sub_class_name);
        }
        if sub_message_found {
            writer.blank_line();
        }

        let base_class = format!("public {}::ProtoMessage", BASE_CLASSES_NAMESPACE);
        writer.class_opening(class_name, Some(&base_class));
        writer.class_public();

        // Aliases give the flattened nested types their natural names
        // inside the class scope.
        let mut alias_found = false;
        for enumeration in message.enums() {
            alias_found = true;
            let flat = format!("{}_{}", class_name, enumeration.name_pascal());
            writer.typedef(&flat, &enumeration.name_pascal());
        }
        for &nested in message.nested_messages() {
            let sub_message = model.message(nested);
            let flat = format!("{}_{}", class_name, sub_message.name_pascal());
            writer.typedef(&flat, &sub_message.name_pascal());
        }
        if alias_found || sub_message_found {
            writer.blank_line();
            writer.class_public();
        }

        writer.method_declaration(class_name, None, "", MethodQuals::default());
        writer.method_declaration(
            class_name,
            None,
            &format!("const {} & src", class_name),
            MethodQuals::default(),
        );
        writer.method_inline_opening(&format!("~{}", class_name), false, true);
        writer.method_inline_closing();
        writer.method_declaration(
            "operator =",
            Some(&format!("{} &", class_name)),
            &format!("const {} & rhs", class_name),
            MethodQuals::default(),
        );
        writer.method_declaration(
            "swap",
            Some("void"),
            &format!("{} * other", class_name),
            MethodQuals::default(),
        );
        writer.method_declaration("clear", Some("void"), "", MethodQuals::overriding());
        writer.method_declaration(
            "parse",
            Some("size_t"),
            "const char * pData",
            MethodQuals::overriding(),
        );
        writer.method_declaration(
            "serialize",
            Some("std::string"),
            "",
            MethodQuals::const_overriding(),
        );
        writer.method_declaration(
            "byteSize",
            Some("size_t"),
            "",
            MethodQuals::const_overriding(),
        );
        writer.method_declaration("valid", Some("bool"), "", MethodQuals::const_overriding());

        for field in message.fields() {
            self.write_field_to_header(writer, field);
        }
        for oneof in message.oneofs() {
            self.write_oneof_to_header(writer, oneof);
        }

        writer.class_private();

        let class_data_name = format!("{}Data", class_name);
        writer.struct_opening(&class_data_name);

        for field in message.fields() {
            self.write_field_index_to_header(writer, field);
        }
        for oneof in message.oneofs() {
            for field in oneof.fields() {
                self.write_field_index_to_header(writer, field);
            }
        }
        writer.blank_line();

        writer.method_declaration(&class_data_name, None, "", MethodQuals::default());
        writer.method_inline_opening(&format!("~{}", class_data_name), false, false);
        writer.method_inline_closing();

        for field in message.fields() {
            self.write_field_backing_to_header(writer, field);
        }
        for oneof in message.oneofs() {
            self.write_oneof_backing_to_header(writer, oneof);
        }
        writer.blank_line();

        writer.class_private();
        writer.method_declaration(
            &class_data_name,
            None,
            &format!("const {} & src", class_data_name),
            MethodQuals::deleted(),
        );
        writer.method_declaration(
            "operator =",
            Some(&format!("{} &", class_data_name)),
            &format!("const {} & rhs", class_data_name),
            MethodQuals::deleted(),
        );
        writer.struct_closing();

        writer.field_declaration(
            "mData",
            &format!("std::shared_ptr<{}>", class_data_name),
            None,
            false,
        );
        writer.class_closing();
    }

    /// The accessor surface of one field; the shape depends on the field's
    /// category and requiredness.
    fn write_field_to_header(&self, writer: &mut CodeWriter, field: &MessageFieldModel) {
        let field_type = full_type_name(field);
        let pascal = field.name_pascal();
        let repeated = field.requiredness() == Requiredness::Repeated;

        match field.category() {
            Some(FieldCategory::Bool) | Some(FieldCategory::Numeric) | Some(FieldCategory::Enum) => {
                if repeated {
                    writer.method_declaration(
                        &format!("size{}", pascal),
                        Some("size_t"),
                        "",
                        MethodQuals::const_qualified(),
                    );
                    writer.method_declaration(
                        field.name(),
                        Some(&field_type),
                        "size_t index",
                        MethodQuals::const_qualified(),
                    );
                    writer.method_declaration(
                        &format!("set{}", pascal),
                        Some("void"),
                        &format!("size_t index, {} value", field_type),
                        MethodQuals::default(),
                    );
                    writer.method_declaration(
                        &format!("add{}", pascal),
                        Some("void"),
                        &format!("{} value", field_type),
                        MethodQuals::default(),
                    );
                    writer.method_declaration(
                        &format!("clear{}", pascal),
                        Some("void"),
                        "",
                        MethodQuals::default(),
                    );
                } else {
                    writer.method_declaration(
                        &format!("has{}", pascal),
                        Some("bool"),
                        "",
                        MethodQuals::const_qualified(),
                    );
                    writer.method_declaration(
                        field.name(),
                        Some(&field_type),
                        "",
                        MethodQuals::const_qualified(),
                    );
                    writer.method_declaration(
                        &format!("set{}", pascal),
                        Some("void"),
                        &format!("{} value", field_type),
                        MethodQuals::default(),
                    );
                    writer.method_declaration(
                        &format!("clear{}", pascal),
                        Some("void"),
                        "",
                        MethodQuals::default(),
                    );
                }
            }

            Some(FieldCategory::String) | Some(FieldCategory::Bytes) | Some(FieldCategory::Message) => {
                if field.category() == Some(FieldCategory::Message) {
                    // Sub-message fields additionally expose construction
                    // of a fresh value owned by the field.
                    if repeated {
                        writer.method_declaration(
                            &format!("addNew{}", pascal),
                            Some(&format!("{} &", field_type)),
                            "",
                            MethodQuals::default(),
                        );
                    } else {
                        writer.method_declaration(
                            &format!("createNew{}", pascal),
                            Some(&format!("{} &", field_type)),
                            "",
                            MethodQuals::default(),
                        );
                    }
                }
                if repeated {
                    writer.method_declaration(
                        &format!("size{}", pascal),
                        Some("size_t"),
                        "",
                        MethodQuals::const_qualified(),
                    );
                    writer.method_declaration(
                        field.name(),
                        Some(&format!("const {} &", field_type)),
                        "size_t index",
                        MethodQuals::const_qualified(),
                    );
                    writer.method_declaration(
                        &format!("set{}", pascal),
                        Some("void"),
                        &format!("size_t index, const {} & value", field_type),
                        MethodQuals::default(),
                    );
                    writer.method_declaration(
                        &format!("add{}", pascal),
                        Some("void"),
                        &format!("const {} & value", field_type),
                        MethodQuals::default(),
                    );
                    writer.method_declaration(
                        &format!("clear{}", pascal),
                        Some("void"),
                        "",
                        MethodQuals::default(),
                    );
                } else {
                    writer.method_declaration(
                        &format!("has{}", pascal),
                        Some("bool"),
                        "",
                        MethodQuals::const_qualified(),
                    );
                    writer.method_declaration(
                        field.name(),
                        Some(&format!("const {} &", field_type)),
                        "",
                        MethodQuals::const_qualified(),
                    );
                    writer.method_declaration(
                        &format!("set{}", pascal),
                        Some("void"),
                        &format!("const {} & value", field_type),
                        MethodQuals::default(),
                    );
                    writer.method_declaration(
                        &format!("clear{}", pascal),
                        Some("void"),
                        "",
                        MethodQuals::default(),
                    );
                }
            }

            None => {}
        }
    }

    fn write_field_index_to_header(&self, writer: &mut CodeWriter, field: &MessageFieldModel) {
        writer.field_declaration(
            &format!("m{}Index", field.name_pascal()),
            "const unsigned int",
            Some(&field.index().to_string()),
            true,
        );
    }

    fn write_field_backing_to_header(&self, writer: &mut CodeWriter, field: &MessageFieldModel) {
        writer.field_declaration(
            &backing_field_name(field),
            &full_type_name_internal(field),
            None,
            false,
        );
    }

    fn write_oneof_to_header(&self, writer: &mut CodeWriter, oneof: &OneofModel) {
        let enum_name = format!("{}Choices", oneof.name_pascal());
        writer.enum_opening(&enum_name);
        writer.enum_value_first("none", 0);
        for (position, field) in oneof.fields().iter().enumerate() {
            writer.enum_value_subsequent(field.name(), position as i32 + 1);
        }
        writer.enum_closing();

        writer.method_declaration(
            &format!("current{}Choice", oneof.name_pascal()),
            Some(&enum_name),
            "",
            MethodQuals::const_qualified(),
        );
        writer.method_declaration(
            &format!("clear{}", oneof.name_pascal()),
            Some("void"),
            "",
            MethodQuals::default(),
        );

        for field in oneof.fields() {
            self.write_field_to_header(writer, field);
        }
    }

    fn write_oneof_backing_to_header(&self, writer: &mut CodeWriter, oneof: &OneofModel) {
        writer.field_declaration(
            &format!("mCurrent{}Choice", oneof.name_pascal()),
            &format!("{}Choices", oneof.name_pascal()),
            None,
            false,
        );
        for field in oneof.fields() {
            self.write_field_backing_to_header(writer, field);
        }
    }

    fn write_message_to_source(
        &self,
        writer: &mut CodeWriter,
        model: &ProtoModel,
        message: &MessageModel,
        class_name: &str,
    ) {
        for &nested in message.nested_messages() {
            let sub_message = model.message(nested);
            let sub_class_name = format!("{}_{}", class_name, sub_message.name_pascal());
            self.write_message_to_source(writer, model, sub_message, &sub_class_name);
        }

        let mut full_scope = message.package().replace('.', "::");
        if !full_scope.is_empty() {
            full_scope.push_str("::");
        }
        full_scope.push_str(class_name);

        self.write_data_constructor_to_source(writer, message, class_name, &full_scope);
        self.write_constructor_to_source(writer, class_name, &full_scope);
        self.write_copy_constructor_to_source(writer, class_name, &full_scope);
        self.write_assignment_operator_to_source(writer, class_name, &full_scope);
        self.write_swap_to_source(writer, class_name, &full_scope);
        self.write_clear_to_source(writer, class_name, &full_scope);
        self.write_parse_to_source(writer, message, class_name, &full_scope);
        self.write_serialize_to_source(writer, message, &full_scope);
        self.write_byte_size_to_source(writer, message, &full_scope);
        self.write_valid_to_source(writer, message, &full_scope);

        for field in message.fields() {
            self.write_field_to_source(writer, field, &full_scope, None);
        }
        for oneof in message.oneofs() {
            self.write_oneof_to_source(writer, oneof, &full_scope);
        }
    }

    /// The data block's constructor: member initializers for defaulted
    /// fields and oneof choices, then wire-index wiring in the body.
    fn write_data_constructor_to_source(
        &self,
        writer: &mut CodeWriter,
        message: &MessageModel,
        class_name: &str,
        full_scope: &str,
    ) {
        let class_data_name = format!("{}Data", class_name);
        let full_data_scope = format!("{}::{}", full_scope, class_data_name);

        let mut initializers: Vec<String> = Vec::new();
        for field in message.fields() {
            if let Some(initializer) = field_initialization(field) {
                initializers.push(initializer);
            }
        }
        for oneof in message.oneofs() {
            initializers.push(format!(
                "mCurrent{}Choice({}::{}Choices::none)",
                oneof.name_pascal(),
                full_scope,
                oneof.name_pascal()
            ));
            for field in oneof.fields() {
                if let Some(initializer) = field_initialization(field) {
                    initializers.push(initializer);
                }
            }
        }

        writer.constructor_implementation_opening(
            &format!("{}::{}", full_data_scope, class_data_name),
            "",
            &initializers.iter().join(", "),
        );

        for field in message.fields() {
            writer.line_indented(&format!(
                "{}.setIndex(m{}Index);",
                backing_field_name(field),
                field.name_pascal()
            ));
        }
        for oneof in message.oneofs() {
            for field in oneof.fields() {
                writer.line_indented(&format!(
                    "{}.setIndex(m{}Index);",
                    backing_field_name(field),
                    field.name_pascal()
                ));
            }
        }

        writer.method_implementation_closing();
    }

    fn write_constructor_to_source(
        &self,
        writer: &mut CodeWriter,
        class_name: &str,
        full_scope: &str,
    ) {
        writer.constructor_implementation_opening(
            &format!("{}::{}", full_scope, class_name),
            "",
            &format!("mData(new {}Data())", class_name),
        );
        writer.method_implementation_closing();
    }

    fn write_copy_constructor_to_source(
        &self,
        writer: &mut CodeWriter,
        class_name: &str,
        full_scope: &str,
    ) {
        writer.constructor_implementation_opening(
            &format!("{}::{}", full_scope, class_name),
            &format!("const {} & src", class_name),
            &format!(
                "{}::ProtoMessage(src), mData(src.mData)",
                BASE_CLASSES_NAMESPACE
            ),
        );
        writer.method_implementation_closing();
    }

    fn write_assignment_operator_to_source(
        &self,
        writer: &mut CodeWriter,
        class_name: &str,
        full_scope: &str,
    ) {
        writer.method_implementation_opening(
            &format!("{}::operator =", full_scope),
            Some(&format!("{} &", full_scope)),
            &format!("const {} & rhs", class_name),
            false,
        );

        writer.if_opening("this == &rhs");
        writer.line_indented("return *this;");
        writer.if_closing();
        writer.blank_line();
        writer.line_indented(&format!(
            "{}::ProtoMessage::operator=(rhs);",
            BASE_CLASSES_NAMESPACE
        ));
        writer.blank_line();
        writer.line_indented("mData = rhs.mData;");
        writer.blank_line();
        writer.line_indented("return *this;");

        writer.method_implementation_closing();
    }

    fn write_swap_to_source(&self, writer: &mut CodeWriter, class_name: &str, full_scope: &str) {
        writer.method_implementation_opening(
            &format!("{}::swap", full_scope),
            Some("void"),
            &format!("{} * other", class_name),
            false,
        );

        let data_type = format!("shared_ptr<{}Data>", class_name);
        writer.line_indented(&format!("{} thisData(mData);", data_type));
        writer.line_indented(&format!("{} otherData(other->mData);", data_type));
        writer.blank_line();
        writer.line_indented("mData = otherData;");
        writer.line_indented("other->mData = thisData;");

        writer.method_implementation_closing();
    }

    fn write_clear_to_source(&self, writer: &mut CodeWriter, class_name: &str, full_scope: &str) {
        writer.method_implementation_opening(
            &format!("{}::clear", full_scope),
            Some("void"),
            "",
            false,
        );
        writer.line_indented(&format!("mData.reset(new {}Data());", class_name));
        writer.method_implementation_closing();
    }

    /// The wire-format parse body: a length prefix, then a loop reading
    /// field keys and dispatching on the field index, skipping unknown
    /// fields by wire type.
    fn write_parse_to_source(
        &self,
        writer: &mut CodeWriter,
        message: &MessageModel,
        class_name: &str,
        full_scope: &str,
    ) {
        writer.method_implementation_opening(
            &format!("{}::parse", full_scope),
            Some("size_t"),
            "const char * pData",
            false,
        );

        writer.if_opening("pData == nullptr");
        writer.line_indented("throw std::invalid_argument(\"pData cannot be null.\");");
        writer.if_closing();
        writer.blank_line();

        writer.line_indented("size_t lengthBytesParsed = 0;");
        writer.line_indented(&format!(
            "std::uint32_t length = {}::PrimitiveEncoding::parseVariableUnsignedInt32(pData, &lengthBytesParsed);",
            BASE_CLASSES_NAMESPACE
        ));
        writer.line_indented("pData += lengthBytesParsed;");
        writer.blank_line();

        writer.line_indented("std::uint32_t remainingBytes = length;");
        writer.while_opening("remainingBytes");

        writer.line_indented("size_t fieldKeyBytesParsed = 0;");
        writer.line_indented(&format!(
            "std::uint32_t fieldKey = {}::PrimitiveEncoding::parseVariableUnsignedInt32(pData, &fieldKeyBytesParsed);",
            BASE_CLASSES_NAMESPACE
        ));
        writer.line_indented("pData += fieldKeyBytesParsed;");
        writer.line_indented("remainingBytes -= fieldKeyBytesParsed;");
        writer.blank_line();

        writer.line_indented("std::uint32_t fieldIndex = fieldKey >> 3;");
        writer.line_indented("std::uint32_t fieldWireType = fieldKey & 0x07;");
        writer.blank_line();

        writer.line_indented("size_t fieldBytesParsed = 0;");
        writer.switch_opening("fieldIndex");

        for field in message.fields() {
            writer.switch_case_opening(&format!(
                "{}Data::m{}Index",
                class_name,
                field.name_pascal()
            ));
            writer.line_indented(&format!(
                "fieldBytesParsed = mData->{}.parse(pData);",
                backing_field_name(field)
            ));
            writer.switch_case_closing();
            writer.blank_line();
        }

        for oneof in message.oneofs() {
            let enum_class_name = format!("{}Choices", oneof.name_pascal());
            let enum_instance_name = format!("mData->mCurrent{}Choice", oneof.name_pascal());
            for field in oneof.fields() {
                writer.switch_case_opening(&format!(
                    "{}Data::m{}Index",
                    class_name,
                    field.name_pascal()
                ));
                writer.line_indented(&format!(
                    "fieldBytesParsed = mData->{}.parse(pData);",
                    backing_field_name(field)
                ));
                writer.line_indented(&format!(
                    "{} = {}::{};",
                    enum_instance_name,
                    enum_class_name,
                    field.name()
                ));
                writer.switch_case_closing();
                writer.blank_line();
            }
        }

        writer.switch_default_case_opening();
        writer.switch_opening("fieldWireType");

        writer.switch_case_opening("0");
        writer.line_indented(&format!(
            "{}::PrimitiveEncoding::parseVariableUnsignedInt64(pData, &fieldBytesParsed);",
            BASE_CLASSES_NAMESPACE
        ));
        writer.switch_case_closing();

        writer.switch_case_opening("1");
        writer.line_indented("fieldBytesParsed = 8;");
        writer.switch_case_closing();

        writer.switch_case_opening("2");
        writer.line_indented("size_t fieldLengthBytesParsed = 0;");
        writer.line_indented(&format!(
            "std::uint32_t fieldLength = {}::PrimitiveEncoding::parseVariableUnsignedInt32(pData, &fieldLengthBytesParsed);",
            BASE_CLASSES_NAMESPACE
        ));
        writer.line_indented("fieldBytesParsed = fieldLengthBytesParsed + fieldLength;");
        writer.switch_case_closing();

        writer.switch_case_opening("5");
        writer.line_indented("fieldBytesParsed = 4;");
        writer.switch_case_closing();

        writer.switch_closing();
        writer.switch_case_closing();

        writer.switch_closing();
        writer.line_indented("pData += fieldBytesParsed;");
        writer.line_indented("remainingBytes -= fieldBytesParsed;");
        writer.while_closing();

        writer.line_indented("return lengthBytesParsed + length;");
        writer.method_implementation_closing();
    }

    /// The serialize body: concatenate every field's serialized form, the
    /// chosen member of each oneof, then length-prefix the result.
    fn write_serialize_to_source(
        &self,
        writer: &mut CodeWriter,
        message: &MessageModel,
        full_scope: &str,
    ) {
        writer.method_implementation_opening(
            &format!("{}::serialize", full_scope),
            Some("std::string"),
            "",
            true,
        );

        writer.line_indented("std::string result;");
        writer.blank_line();

        for field in message.fields() {
            writer.line_indented(&format!(
                "result += mData->{}.serialize();",
                backing_field_name(field)
            ));
            writer.blank_line();
        }

        for oneof in message.oneofs() {
            self.write_oneof_choice_switch(writer, oneof, |field| {
                format!("result += mData->{}.serialize();", backing_field_name(field))
            });
            writer.blank_line();
        }

        writer.if_opening("result.empty()");
        writer.line_indented("return result;");
        writer.if_closing();
        writer.else_if_opening("this->index() == 0");
        writer.line_indented(&format!(
            "result = {}::PrimitiveEncoding::serializeVariableUnsignedInt32(static_cast<std::uint32_t>(result.length())) +",
            BASE_CLASSES_NAMESPACE
        ));
        writer.line_indented("    result;");
        writer.if_closing();
        writer.else_opening();
        writer.line_indented(&format!(
            "result = {}::PrimitiveEncoding::serializeVariableUnsignedInt32(key()) +",
            BASE_CLASSES_NAMESPACE
        ));
        writer.line_indented(&format!(
            "    {}::PrimitiveEncoding::serializeVariableUnsignedInt32(static_cast<std::uint32_t>(result.length())) +",
            BASE_CLASSES_NAMESPACE
        ));
        writer.line_indented("    result;");
        writer.if_closing();
        writer.blank_line();

        writer.line_indented("return result;");
        writer.method_implementation_closing();
    }

    fn write_byte_size_to_source(
        &self,
        writer: &mut CodeWriter,
        message: &MessageModel,
        full_scope: &str,
    ) {
        writer.method_implementation_opening(
            &format!("{}::byteSize", full_scope),
            Some("size_t"),
            "",
            true,
        );

        writer.line_indented("size_t result = 0;");
        writer.blank_line();

        for field in message.fields() {
            writer.line_indented(&format!(
                "result += mData->{}.byteSize();",
                backing_field_name(field)
            ));
            writer.blank_line();
        }

        for oneof in message.oneofs() {
            self.write_oneof_choice_switch(writer, oneof, |field| {
                format!("result += mData->{}.byteSize();", backing_field_name(field))
            });
            writer.blank_line();
        }

        writer.line_indented(&format!(
            "result += {}::PrimitiveEncoding::sizeVariableUnsignedInt32(static_cast<std::uint32_t>(result));",
            BASE_CLASSES_NAMESPACE
        ));
        writer.line_indented(&format!(
            "result += {}::PrimitiveEncoding::sizeVariableUnsignedInt32(key());",
            BASE_CLASSES_NAMESPACE
        ));
        writer.blank_line();

        writer.line_indented("return result;");
        writer.method_implementation_closing();
    }

    fn write_valid_to_source(
        &self,
        writer: &mut CodeWriter,
        message: &MessageModel,
        full_scope: &str,
    ) {
        writer.method_implementation_opening(
            &format!("{}::valid", full_scope),
            Some("bool"),
            "",
            true,
        );

        for field in message.fields() {
            writer.if_opening(&format!("!mData->{}.valid()", backing_field_name(field)));
            writer.line_indented("return false;");
            writer.if_closing();
        }
        writer.line_indented("return true;");

        writer.method_implementation_closing();
    }

    /// A switch over a oneof's current choice with one statement per field
    /// and an empty `none` arm.
    fn write_oneof_choice_switch(
        &self,
        writer: &mut CodeWriter,
        oneof: &OneofModel,
        statement: impl Fn(&MessageFieldModel) -> String,
    ) {
        let enum_class_name = format!("{}Choices", oneof.name_pascal());
        let enum_instance_name = format!("mData->mCurrent{}Choice", oneof.name_pascal());

        writer.switch_opening(&enum_instance_name);
        writer.switch_case_opening(&format!("{}::none", enum_class_name));
        writer.switch_case_closing();
        for field in oneof.fields() {
            writer.blank_line();
            writer.switch_case_opening(&format!("{}::{}", enum_class_name, field.name()));
            writer.line_indented(&statement(field));
            writer.switch_case_closing();
        }
        writer.switch_closing();
    }

    fn write_oneof_to_source(&self, writer: &mut CodeWriter, oneof: &OneofModel, full_scope: &str) {
        self.write_oneof_current_to_source(writer, oneof, full_scope);
        self.write_oneof_clear_to_source(writer, oneof, full_scope);

        for field in oneof.fields() {
            self.write_field_to_source(writer, field, full_scope, Some(oneof));
        }
    }

    fn write_oneof_current_to_source(
        &self,
        writer: &mut CodeWriter,
        oneof: &OneofModel,
        full_scope: &str,
    ) {
        let enum_class_name = format!("{}Choices", oneof.name_pascal());
        writer.method_implementation_opening(
            &format!("{}::current{}Choice", full_scope, oneof.name_pascal()),
            Some(&format!("{}::{}", full_scope, enum_class_name)),
            "",
            true,
        );
        writer.line_indented(&format!(
            "return mData->mCurrent{}Choice;",
            oneof.name_pascal()
        ));
        writer.method_implementation_closing();
    }

    /// Clearing a oneof clears whichever member is active, then resets the
    /// choice to `none`.
    fn write_oneof_clear_to_source(
        &self,
        writer: &mut CodeWriter,
        oneof: &OneofModel,
        full_scope: &str,
    ) {
        writer.method_implementation_opening(
            &format!("{}::clear{}", full_scope, oneof.name_pascal()),
            Some("void"),
            "",
            false,
        );

        self.write_oneof_choice_switch(writer, oneof, |field| {
            format!("mData->{}.clearValue();", backing_field_name(field))
        });
        writer.blank_line();
        writer.line_indented(&format!(
            "mData->mCurrent{}Choice = {}Choices::none;",
            oneof.name_pascal(),
            oneof.name_pascal()
        ));

        writer.method_implementation_closing();
    }

    fn write_field_to_source(
        &self,
        writer: &mut CodeWriter,
        field: &MessageFieldModel,
        full_scope: &str,
        oneof: Option<&OneofModel>,
    ) {
        if field.requiredness() == Requiredness::Repeated {
            self.write_field_size_to_source(writer, field, full_scope);
            self.write_field_get_repeated_to_source(writer, field, full_scope);
            self.write_field_set_repeated_to_source(writer, field, full_scope);
            self.write_field_add_to_source(writer, field, full_scope);
            self.write_field_add_new_to_source(writer, field, full_scope);
            self.write_field_clear_repeated_to_source(writer, field, full_scope);
        } else {
            self.write_field_has_to_source(writer, field, full_scope, oneof);
            self.write_field_get_to_source(writer, field, full_scope);
            self.write_field_set_to_source(writer, field, full_scope, oneof);
            self.write_field_create_new_to_source(writer, field, full_scope, oneof);
            self.write_field_clear_to_source(writer, field, full_scope, oneof);
        }
    }

    fn write_field_size_to_source(
        &self,
        writer: &mut CodeWriter,
        field: &MessageFieldModel,
        full_scope: &str,
    ) {
        writer.method_implementation_opening(
            &format!("{}::size{}", full_scope, field.name_pascal()),
            Some("size_t"),
            "",
            true,
        );
        writer.line_indented(&format!(
            "return mData->{}.size();",
            backing_field_name(field)
        ));
        writer.method_implementation_closing();
    }

    fn write_field_get_repeated_to_source(
        &self,
        writer: &mut CodeWriter,
        field: &MessageFieldModel,
        full_scope: &str,
    ) {
        let field_type = full_type_name(field);
        let return_type = if returns_by_value(field) {
            field_type
        } else {
            format!("const {} &", field_type)
        };
        writer.method_implementation_opening(
            &format!("{}::{}", full_scope, field.name()),
            Some(&return_type),
            "size_t index",
            true,
        );
        writer.line_indented(&format!(
            "return mData->{}.value(index);",
            backing_field_name(field)
        ));
        writer.method_implementation_closing();
    }

    fn write_field_set_repeated_to_source(
        &self,
        writer: &mut CodeWriter,
        field: &MessageFieldModel,
        full_scope: &str,
    ) {
        let field_type = full_type_name(field);
        let parameters = if returns_by_value(field) {
            format!("size_t index, {} value", field_type)
        } else {
            format!("size_t index, const {} & value", field_type)
        };
        writer.method_implementation_opening(
            &format!("{}::set{}", full_scope, field.name_pascal()),
            Some("void"),
            &parameters,
            false,
        );
        writer.line_indented(&format!(
            "mData->{}.setValue(index, value);",
            backing_field_name(field)
        ));
        writer.method_implementation_closing();
    }

    fn write_field_add_to_source(
        &self,
        writer: &mut CodeWriter,
        field: &MessageFieldModel,
        full_scope: &str,
    ) {
        let field_type = full_type_name(field);
        let parameters = if returns_by_value(field) {
            format!("{} value", field_type)
        } else {
            format!("const {} & value", field_type)
        };
        writer.method_implementation_opening(
            &format!("{}::add{}", full_scope, field.name_pascal()),
            Some("void"),
            &parameters,
            false,
        );
        writer.line_indented(&format!(
            "mData->{}.addValue(value);",
            backing_field_name(field)
        ));
        writer.method_implementation_closing();
    }

    fn write_field_add_new_to_source(
        &self,
        writer: &mut CodeWriter,
        field: &MessageFieldModel,
        full_scope: &str,
    ) {
        if field.category() != Some(FieldCategory::Message) {
            return;
        }
        writer.method_implementation_opening(
            &format!("{}::addNew{}", full_scope, field.name_pascal()),
            Some(&format!("{} &", full_type_name(field))),
            "",
            false,
        );
        writer.line_indented(&format!(
            "return mData->{}.addNewValue();",
            backing_field_name(field)
        ));
        writer.method_implementation_closing();
    }

    fn write_field_clear_repeated_to_source(
        &self,
        writer: &mut CodeWriter,
        field: &MessageFieldModel,
        full_scope: &str,
    ) {
        writer.method_implementation_opening(
            &format!("{}::clear{}", full_scope, field.name_pascal()),
            Some("void"),
            "",
            false,
        );
        writer.line_indented(&format!(
            "mData->{}.clearValue();",
            backing_field_name(field)
        ));
        writer.method_implementation_closing();
    }

    /// `has` on a oneof member is false whenever the member is not the
    /// current choice.
    fn write_field_has_to_source(
        &self,
        writer: &mut CodeWriter,
        field: &MessageFieldModel,
        full_scope: &str,
        oneof: Option<&OneofModel>,
    ) {
        writer.method_implementation_opening(
            &format!("{}::has{}", full_scope, field.name_pascal()),
            Some("bool"),
            "",
            true,
        );

        if let Some(oneof) = oneof {
            writer.if_opening(&format!(
                "mData->mCurrent{}Choice != {}Choices::{}",
                oneof.name_pascal(),
                oneof.name_pascal(),
                field.name()
            ));
            writer.line_indented("return false;");
            writer.if_closing();
            writer.blank_line();
        }

        writer.line_indented(&format!(
            "return mData->{}.hasValue();",
            backing_field_name(field)
        ));
        writer.method_implementation_closing();
    }

    fn write_field_get_to_source(
        &self,
        writer: &mut CodeWriter,
        field: &MessageFieldModel,
        full_scope: &str,
    ) {
        let field_type = full_type_name(field);
        let return_type = if returns_by_value(field) {
            field_type
        } else {
            format!("const {} &", field_type)
        };
        writer.method_implementation_opening(
            &format!("{}::{}", full_scope, field.name()),
            Some(&return_type),
            "",
            true,
        );
        writer.line_indented(&format!(
            "return mData->{}.value();",
            backing_field_name(field)
        ));
        writer.method_implementation_closing();
    }

    fn write_field_set_to_source(
        &self,
        writer: &mut CodeWriter,
        field: &MessageFieldModel,
        full_scope: &str,
        oneof: Option<&OneofModel>,
    ) {
        let field_type = full_type_name(field);
        let parameters = if returns_by_value(field) {
            format!("{} value", field_type)
        } else {
            format!("const {} & value", field_type)
        };
        writer.method_implementation_opening(
            &format!("{}::set{}", full_scope, field.name_pascal()),
            Some("void"),
            &parameters,
            false,
        );
        writer.line_indented(&format!(
            "mData->{}.setValue(value);",
            backing_field_name(field)
        ));

        if let Some(oneof) = oneof {
            writer.blank_line();
            writer.line_indented(&format!(
                "mData->mCurrent{}Choice = {}Choices::{};",
                oneof.name_pascal(),
                oneof.name_pascal(),
                field.name()
            ));
        }

        writer.method_implementation_closing();
    }

    fn write_field_create_new_to_source(
        &self,
        writer: &mut CodeWriter,
        field: &MessageFieldModel,
        full_scope: &str,
        oneof: Option<&OneofModel>,
    ) {
        if field.category() != Some(FieldCategory::Message) {
            return;
        }
        writer.method_implementation_opening(
            &format!("{}::createNew{}", full_scope, field.name_pascal()),
            Some(&format!("{} &", full_type_name(field))),
            "",
            false,
        );

        if let Some(oneof) = oneof {
            writer.line_indented(&format!(
                "mData->mCurrent{}Choice = {}Choices::{};",
                oneof.name_pascal(),
                oneof.name_pascal(),
                field.name()
            ));
            writer.blank_line();
        }

        writer.line_indented(&format!(
            "return mData->{}.createNewValue();",
            backing_field_name(field)
        ));
        writer.method_implementation_closing();
    }

    fn write_field_clear_to_source(
        &self,
        writer: &mut CodeWriter,
        field: &MessageFieldModel,
        full_scope: &str,
        oneof: Option<&OneofModel>,
    ) {
        writer.method_implementation_opening(
            &format!("{}::clear{}", full_scope, field.name_pascal()),
            Some("void"),
            "",
            false,
        );

        if let Some(oneof) = oneof {
            writer.if_opening(&format!(
                "mData->mCurrent{}Choice != {}Choices::{}",
                oneof.name_pascal(),
                oneof.name_pascal(),
                field.name()
            ));
            writer.line_indented("return;");
            writer.if_closing();
            writer.blank_line();
        }

        writer.line_indented(&format!(
            "mData->{}.clearValue();",
            backing_field_name(field)
        ));

        if let Some(oneof) = oneof {
            writer.blank_line();
            writer.line_indented(&format!(
                "mData->mCurrent{}Choice = {}Choices::none;",
                oneof.name_pascal(),
                oneof.name_pascal()
            ));
        }

        writer.method_implementation_closing();
    }
}

/// Tracks which namespace blocks are open while walking entities in source
/// order, closing and reopening them whenever the package changes.
struct NamespaceTracker {
    current: String,
    open: usize,
}

impl NamespaceTracker {
    fn new() -> NamespaceTracker {
        NamespaceTracker {
            current: String::new(),
            open: 0,
        }
    }

    fn switch_to(&mut self, writer: &mut CodeWriter, package: &str) {
        if package == self.current {
            return;
        }
        self.close(writer);
        self.current = package.to_string();
        for segment in package_segments(package) {
            writer.namespace_opening(segment);
            self.open += 1;
        }
    }

    fn close(&mut self, writer: &mut CodeWriter) {
        for _ in 0..self.open {
            writer.namespace_closing();
        }
        self.open = 0;
    }
}

fn header_guard_name(base_name: &str, project_name: &str) -> String {
    if project_name.is_empty() {
        format!("{}_protocol_h", base_name)
    } else {
        format!("{}_{}_protocol_h", project_name, base_name)
    }
}

fn common_guard_name(project_name: &str) -> String {
    if project_name.is_empty() {
        format!("{}_h", BASE_CLASSES_FILE_NAME)
    } else {
        format!("{}_{}_h", project_name, BASE_CLASSES_FILE_NAME)
    }
}

/// The member initializer applying a field's `[default = …]` value, or
/// `None` when the field has no default or its category cannot take one.
fn field_initialization(field: &MessageFieldModel) -> Option<String> {
    let default_value = field.default_value()?;
    let name = backing_field_name(field);
    match field.category() {
        Some(FieldCategory::Bool) | Some(FieldCategory::Numeric) => {
            Some(format!("{}({})", name, default_value))
        }
        Some(FieldCategory::Enum) => Some(format!(
            "{}({}::{})",
            name,
            full_type_name(field),
            default_value
        )),
        Some(FieldCategory::String) => Some(format!("{}(\"{}\")", name, default_value)),
        _ => None,
    }
}

fn backing_field_name(field: &MessageFieldModel) -> String {
    if field.requiredness() == Requiredness::Repeated {
        format!("m{}Collection", field.name_pascal())
    } else {
        format!("m{}Value", field.name_pascal())
    }
}

/// Whether accessors pass the field's value type by value rather than by
/// const reference.
fn returns_by_value(field: &MessageFieldModel) -> bool {
    matches!(
        field.category(),
        Some(FieldCategory::Bool) | Some(FieldCategory::Numeric) | Some(FieldCategory::Enum)
    )
}

/// The C++ type exposed by a field's accessors.
fn full_type_name(field: &MessageFieldModel) -> String {
    match field.field_type() {
        "bool" => "bool".to_string(),
        "string" | "bytes" => "std::string".to_string(),
        "double" => "double".to_string(),
        "float" => "float".to_string(),
        "int32" | "sint32" | "fixed32" | "sfixed32" => "int32_t".to_string(),
        "int64" | "sint64" | "fixed64" | "sfixed64" => "int64_t".to_string(),
        "uint32" => "uint32_t".to_string(),
        "uint64" => "uint64_t".to_string(),
        _ => {
            // The resolved path flattens nested types to their emitted
            // `Outer_Inner` class names even when the schema referred to
            // them by a bare suffix.
            let reference = if field.resolved_type_path().is_empty() {
                field.field_type()
            } else {
                field.resolved_type_path()
            };
            let type_name = to_pascal_path(reference);
            let type_package = field.field_type_package().replace('.', "::");
            if type_package.is_empty() {
                type_name
            } else {
                format!("{}::{}", type_package, type_name)
            }
        }
    }
}

/// The runtime wrapper type backing a field inside the private data block.
fn full_type_name_internal(field: &MessageFieldModel) -> String {
    let repeated = field.requiredness() == Requiredness::Repeated;
    let wrapper = match field.field_type() {
        "bool" => Some("ProtoBool"),
        "string" => Some("ProtoString"),
        "bytes" => Some("ProtoBytes"),
        "double" => Some("ProtoDouble"),
        "float" => Some("ProtoFloat"),
        "int32" => Some("ProtoInt32"),
        "int64" => Some("ProtoInt64"),
        "uint32" => Some("ProtoUnsignedInt32"),
        "uint64" => Some("ProtoUnsignedInt64"),
        "sint32" => Some("ProtoSignedInt32"),
        "sint64" => Some("ProtoSignedInt64"),
        "fixed32" => Some("ProtoFixedInt32"),
        "fixed64" => Some("ProtoFixedInt64"),
        "sfixed32" => Some("ProtoFixedSignedInt32"),
        "sfixed64" => Some("ProtoFixedSignedInt64"),
        _ => None,
    };
    if let Some(wrapper) = wrapper {
        let suffix = if repeated { "Collection" } else { "" };
        return format!("{}::{}{}", BASE_CLASSES_NAMESPACE, wrapper, suffix);
    }

    let type_name = full_type_name(field);
    if field.category() == Some(FieldCategory::Enum) {
        if repeated {
            format!("{}::ProtoEnumCollection<{}>", BASE_CLASSES_NAMESPACE, type_name)
        } else {
            format!("{}::ProtoEnum<{}>", BASE_CLASSES_NAMESPACE, type_name)
        }
    } else if repeated {
        format!(
            "{}::ProtoMessageCollection<{}>",
            BASE_CLASSES_NAMESPACE, type_name
        )
    } else {
        format!(
            "{}::ProtoMessageField<{}>",
            BASE_CLASSES_NAMESPACE, type_name
        )
    }
}
