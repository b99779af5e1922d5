//! End-to-end parsing scenarios over complete schema sources.

use pretty_assertions::assert_eq;

use protogen::{
    FieldCategory, ImportVisibility, ProtoModel, ProtoParser, Requiredness,
};

fn parse(source: &str, file_name: &str) -> ProtoModel {
    ProtoParser::from_source(source, file_name)
        .parse()
        .unwrap_or_else(|err| panic!("parse failed: {}", err))
}

#[test]
fn empty_file_parses_to_an_empty_model() {
    let model = parse("", "Empty.proto");
    assert_eq!("", model.current_package());
    assert!(model.imports().is_empty());
    assert!(model.enums().is_empty());
    assert_eq!(0, model.messages().count());
}

#[test]
fn comments_and_whitespace_only() {
    let model = parse(
        "// just a comment\n/* and a block\n   comment */\n\n",
        "Empty.proto",
    );
    assert_eq!(0, model.messages().count());
}

#[test]
fn package_imports_and_entities_keep_order() {
    let source = "\
package demo.schema;

import \"Common.proto\";
import public \"Shared.proto\";

enum colors { red = 0; green = 1; blue = 2; }
enum sizes { small = 0; large = 1; }

message person {
  required string name = 1;
  optional int32 age = 2 [default = 0];
  repeated string alias = 3;
}
";
    let model = parse(source, "Person.proto");
    assert_eq!("demo.schema", model.current_package());

    assert_eq!(2, model.imports().len());
    assert_eq!("Common.proto", model.imports()[0].path());
    assert_eq!(ImportVisibility::Public, model.imports()[1].visibility());

    let enum_names: Vec<_> = model.enums().iter().map(|e| e.name()).collect();
    assert_eq!(vec!["colors", "sizes"], enum_names);
    assert_eq!("demo.schema", model.enums()[0].package());

    let person = model.messages().next().unwrap();
    assert_eq!("person", person.name());
    assert_eq!("Person", person.name_pascal());
    assert_eq!("demo.schema", person.package());

    let fields = person.fields();
    assert_eq!(3, fields.len());
    assert_eq!(
        vec!["name", "age", "alias"],
        fields.iter().map(|f| f.name()).collect::<Vec<_>>()
    );
    assert_eq!(vec![1, 2, 3], fields.iter().map(|f| f.index()).collect::<Vec<_>>());
    assert_eq!(Requiredness::Required, fields[0].requiredness());
    assert_eq!(Some(FieldCategory::String), fields[0].category());
    assert_eq!(Some("0"), fields[1].default_value());
    assert_eq!(Some(FieldCategory::Numeric), fields[1].category());
    assert_eq!(Requiredness::Repeated, fields[2].requiredness());
}

#[test]
fn oneof_parses_with_optional_fields() {
    let source = "\
message messageOne {
  oneof pick {
    string sOne = 1;
    bool bOne = 2;
    int32 iOne = 3;
  }
}
";
    let model = parse(source, "MessageOneof.proto");
    let mut message_count = 0;
    for message in model.messages() {
        message_count += 1;
        assert_eq!("messageOne", message.name());
        assert!(message.fields().is_empty());

        let mut oneof_count = 0;
        for oneof in message.oneofs() {
            oneof_count += 1;
            let fields = oneof.fields();
            assert_eq!(3, fields.len());

            assert_eq!(Requiredness::Optional, fields[0].requiredness());
            assert_eq!("string", fields[0].field_type());
            assert_eq!("sOne", fields[0].name());
            assert_eq!(1, fields[0].index());

            assert_eq!(Requiredness::Optional, fields[1].requiredness());
            assert_eq!("bool", fields[1].field_type());
            assert_eq!("bOne", fields[1].name());
            assert_eq!(2, fields[1].index());

            assert_eq!(Requiredness::Optional, fields[2].requiredness());
            assert_eq!("int32", fields[2].field_type());
            assert_eq!("iOne", fields[2].name());
            assert_eq!(3, fields[2].index());
        }
        assert_eq!(1, oneof_count);
    }
    assert_eq!(1, message_count);
}

#[test]
fn multiple_oneofs_and_nested_messages() {
    let source = "\
message messageOne {
  oneof first {
    string sOne = 1;
    bool bOne = 2;
  }
  oneof second {
    bool bThree = 3;
    int32 iThree = 4;
  }
  required int32 direct = 5;
  message messageTwo {
    oneof inner {
      string sTwo = 1;
      int32 iTwo = 2;
    }
    required int32 direct = 3;
  }
}
";
    let model = parse(source, "MessageOneofMultiple.proto");
    let outer = model.messages().next().unwrap();
    assert_eq!("messageOne", outer.name());
    assert_eq!(1, outer.fields().len());
    assert_eq!(2, outer.oneofs().len());

    let first = &outer.oneofs()[0];
    assert_eq!("first", first.name());
    assert_eq!(2, first.fields().len());
    assert_eq!("sOne", first.fields()[0].name());
    assert_eq!(2, first.fields()[1].index());

    let second = &outer.oneofs()[1];
    assert_eq!("bThree", second.fields()[0].name());
    assert_eq!(4, second.fields()[1].index());

    assert_eq!(1, outer.nested_messages().len());
    let inner = model.message(outer.nested_messages()[0]);
    assert_eq!("messageTwo", inner.name());
    assert_eq!(1, inner.fields().len());
    assert_eq!(1, inner.oneofs().len());
    assert_eq!("sTwo", inner.oneofs()[0].fields()[0].name());
}

#[test]
fn nested_enums_and_user_type_references() {
    let source = "\
package demo;

message widget {
  enum state { off = 0; on = 1; }
  required state current = 1;
  optional widget peer = 2;
}
";
    let model = parse(source, "Widget.proto");
    let widget = model.messages().next().unwrap();
    assert_eq!(1, widget.enums().len());
    assert_eq!("state", widget.enums()[0].name());

    let fields = widget.fields();
    assert_eq!(Some(FieldCategory::Enum), fields[0].category());
    assert_eq!("demo", fields[0].field_type_package());
    assert_eq!(Some(FieldCategory::Message), fields[1].category());
}

#[test]
fn unknown_type_reference_is_a_schema_error() {
    let err = ProtoParser::from_source(
        "message m { required mystery x = 1; }",
        "Mystery.proto",
    )
    .parse()
    .unwrap_err();
    assert!(err.to_string().contains("unknown field type 'mystery'"));
}

#[test]
fn field_indices_stay_unique_across_oneofs_in_source_order() {
    let source = "\
message m {
  required int32 a = 1;
  oneof pick { string b = 2; bool c = 3; }
  optional int32 d = 4;
}
";
    let model = parse(source, "Indices.proto");
    let message = model.messages().next().unwrap();
    let mut indices: Vec<u32> = message.fields().iter().map(|f| f.index()).collect();
    for oneof in message.oneofs() {
        indices.extend(oneof.fields().iter().map(|f| f.index()));
    }
    indices.sort_unstable();
    let mut deduped = indices.clone();
    deduped.dedup();
    assert_eq!(indices, deduped);
}

#[test]
fn enum_default_value_is_kept_verbatim() {
    let source = "\
enum colors { red = 0; green = 1; }

message m {
  optional colors tint = 1 [default = green];
}
";
    let model = parse(source, "Defaults.proto");
    let field = &model.messages().next().unwrap().fields()[0];
    assert_eq!(Some("green"), field.default_value());
    assert_eq!(Some(FieldCategory::Enum), field.category());
}

/// Renders a model back to schema text so that re-parsing it can be
/// compared against the original parse.
fn render(model: &ProtoModel) -> String {
    use protogen::{FieldCategory as Category, ImportVisibility as Visibility, MessageModel};

    fn render_fields(out: &mut String, fields: &[protogen::MessageFieldModel], indent: &str) {
        for field in fields {
            let requiredness = match field.requiredness() {
                Requiredness::Required => "required ",
                Requiredness::Optional => "optional ",
                Requiredness::Repeated => "repeated ",
            };
            out.push_str(indent);
            out.push_str(requiredness);
            out.push_str(&format!("{} {} = {}", field.field_type(), field.name(), field.index()));
            if let Some(default_value) = field.default_value() {
                if field.category() == Some(Category::String) {
                    out.push_str(&format!(" [default = \"{}\"]", default_value));
                } else {
                    out.push_str(&format!(" [default = {}]", default_value));
                }
            }
            out.push_str(";\n");
        }
    }

    fn render_message(out: &mut String, model: &ProtoModel, message: &MessageModel, indent: &str) {
        out.push_str(&format!("{}message {} {{\n", indent, message.name()));
        let inner = format!("{}  ", indent);
        for enumeration in message.enums() {
            out.push_str(&format!("{}enum {} {{\n", inner, enumeration.name()));
            for value in enumeration.values() {
                out.push_str(&format!("{}  {} = {};\n", inner, value.name(), value.value()));
            }
            out.push_str(&format!("{}}}\n", inner));
        }
        for &nested in message.nested_messages() {
            render_message(out, model, model.message(nested), &inner);
        }
        render_fields(out, message.fields(), &inner);
        for oneof in message.oneofs() {
            out.push_str(&format!("{}oneof {} {{\n", inner, oneof.name()));
            for field in oneof.fields() {
                out.push_str(&format!(
                    "{}  {} {} = {};\n",
                    inner,
                    field.field_type(),
                    field.name(),
                    field.index()
                ));
            }
            out.push_str(&format!("{}}}\n", inner));
        }
        out.push_str(&format!("{}}}\n", indent));
    }

    let mut out = String::new();
    if !model.current_package().is_empty() {
        out.push_str(&format!("package {};\n", model.current_package()));
    }
    for import in model.imports() {
        let visibility = match import.visibility() {
            Visibility::Normal => "",
            Visibility::Public => "public ",
            Visibility::Weak => "weak ",
        };
        out.push_str(&format!("import {}\"{}\";\n", visibility, import.path()));
    }
    for enumeration in model.enums() {
        out.push_str(&format!("enum {} {{\n", enumeration.name()));
        for value in enumeration.values() {
            out.push_str(&format!("  {} = {};\n", value.name(), value.value()));
        }
        out.push_str("}\n");
    }
    for message in model.messages() {
        render_message(&mut out, model, message, "");
    }
    out
}

#[test]
fn pretty_printing_round_trips_to_an_equivalent_model() {
    let source = "\
package demo.things;

import \"Common.proto\";
import weak \"Old.proto\";

enum colors { red = 0; green = 1; }

message person {
  enum mood { calm = 0; tense = 1; }
  message address { required string street = 1; }
  required string name = 1;
  optional int32 age = 2 [default = 0];
  optional string nick = 3 [default = \"anon\"];
  repeated colors favorites = 4;
  optional address home = 5;
  oneof contact { string email = 6; uint64 phone = 7; }
}
";
    let first = parse(source, "Round.proto");
    let printed = render(&first);
    let second = parse(&printed, "Round.proto");
    assert_eq!(printed, render(&second));
}

#[test]
fn parse_error_positions_point_at_the_offending_token() {
    let err = ProtoParser::from_source(
        "message m {\n  required int32 a = 1;\n  required int32 b = oops;\n}",
        "Broken.proto",
    )
    .parse()
    .unwrap_err();
    assert_eq!(
        "Broken.proto:3:22: Expected field index.",
        err.to_string()
    );
}
