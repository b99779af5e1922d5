//! End-to-end generation scenarios: compile a schema and inspect the
//! emitted C++ text.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use protogen::{compile_protos, Config};

/// Writes the schema into a scratch directory, compiles it, and returns
/// the generated header and source text.
fn compile(file_name: &str, source: &str) -> (tempfile::TempDir, String, String) {
    let dir = tempdir().unwrap();
    let proto_path = dir.path().join(file_name);
    fs::write(&proto_path, source).unwrap();
    let out_dir = dir.path().join("generated");
    compile_protos(&[&proto_path], &out_dir).unwrap();

    let base = Path::new(file_name).file_stem().unwrap().to_str().unwrap();
    let header = fs::read_to_string(out_dir.join(format!("{}.protocol.h", base))).unwrap();
    let src = fs::read_to_string(out_dir.join(format!("{}.protocol.cpp", base))).unwrap();
    (dir, header, src)
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("expected {:?} in generated output", needle))
}

#[test]
fn empty_schema_generates_only_the_frame() {
    let (_dir, header, _source) = compile("Empty.proto", "   \n\t\n");
    assert!(header.contains("generated from a Protocol Buffers schema"));
    assert!(header.contains("#ifndef Empty_protocol_h"));
    assert!(header.contains("#define Empty_protocol_h"));
    assert!(header.contains("#include <cstdint>"));
    assert!(header.contains("#include \"ProtoBase.protocol.h\""));
    assert!(header.contains("#endif"));
    assert!(!header.contains("class "));
    assert!(!header.contains("enum "));
}

#[test]
fn multiple_enums_in_source_order() {
    let source = "\
enum colors { red = 0; green = 1; blue = 2; }
enum sizes { small = 0; large = 1; }
";
    let (_dir, header, _source) = compile("EnumMultiple.proto", source);

    let colors = position(&header, "enum class Colors");
    let sizes = position(&header, "enum class Sizes");
    assert!(colors < sizes);

    let red = position(&header, "red = 0,");
    let green = position(&header, "green = 1,");
    let blue = position(&header, "blue = 2");
    assert!(red < green && green < blue);
    assert!(header.contains("small = 0,"));
    assert!(header.contains("large = 1"));

    assert!(!header.contains("class Colors :"));
    assert!(!header.contains("ProtoMessage"));
}

#[test]
fn message_fields_expose_the_accessor_matrix() {
    let source = "\
message person {
  required string name = 1;
  optional int32 age = 2 [default = 0];
  repeated string alias = 3;
}
";
    let (_dir, header, source) = compile("MessageField.proto", source);

    assert!(header.contains("class Person : public Protogen::ProtoMessage"));

    // Singular string field.
    assert!(header.contains("bool hasName() const;"));
    assert!(header.contains("const std::string & name() const;"));
    assert!(header.contains("void setName(const std::string & value);"));
    assert!(header.contains("void clearName();"));

    // Singular numeric field.
    assert!(header.contains("bool hasAge() const;"));
    assert!(header.contains("int32_t age() const;"));
    assert!(header.contains("void setAge(int32_t value);"));
    assert!(header.contains("void clearAge();"));

    // Repeated string field.
    assert!(header.contains("size_t sizeAlias() const;"));
    assert!(header.contains("const std::string & alias(size_t index) const;"));
    assert!(header.contains("void setAlias(size_t index, const std::string & value);"));
    assert!(header.contains("void addAlias(const std::string & value);"));
    assert!(header.contains("void clearAlias();"));

    // Lifecycle and canonical operations.
    assert!(header.contains("Person();"));
    assert!(header.contains("Person(const Person & src);"));
    assert!(header.contains("virtual ~Person()"));
    assert!(header.contains("Person & operator =(const Person & rhs);"));
    assert!(header.contains("void swap(Person * other);"));
    assert!(header.contains("void clear() override;"));
    assert!(header.contains("size_t parse(const char * pData) override;"));
    assert!(header.contains("std::string serialize() const override;"));
    assert!(header.contains("size_t byteSize() const override;"));
    assert!(header.contains("bool valid() const override;"));

    // Backing storage and wire-index constants.
    assert!(header.contains("struct PersonData"));
    assert!(header.contains("static const unsigned int mNameIndex = 1;"));
    assert!(header.contains("static const unsigned int mAgeIndex = 2;"));
    assert!(header.contains("static const unsigned int mAliasIndex = 3;"));
    assert!(header.contains("Protogen::ProtoString mNameValue;"));
    assert!(header.contains("Protogen::ProtoInt32 mAgeValue;"));
    assert!(header.contains("Protogen::ProtoStringCollection mAliasCollection;"));
    assert!(header.contains("std::shared_ptr<PersonData> mData;"));

    // The numeric default initialises the backing field.
    assert!(source.contains("mAgeValue(0)"));
    assert!(source.contains("mNameValue.setIndex(mNameIndex);"));
}

#[test]
fn oneof_generates_choices_and_guarded_accessors() {
    let source = "\
message messageOne {
  oneof pick {
    string sOne = 1;
    bool bOne = 2;
    int32 iOne = 3;
  }
}
";
    let (_dir, header, source) = compile("MessageOneof.proto", source);

    assert!(header.contains("enum class PickChoices"));
    assert!(header.contains("none = 0,"));
    assert!(header.contains("sOne = 1,"));
    assert!(header.contains("bOne = 2,"));
    assert!(header.contains("iOne = 3"));
    assert!(header.contains("PickChoices currentPickChoice() const;"));
    assert!(header.contains("void clearPick();"));
    assert!(header.contains("bool hasSOne() const;"));
    assert!(header.contains("void setSOne(const std::string & value);"));
    assert!(header.contains("bool hasBOne() const;"));
    assert!(header.contains("PickChoices mCurrentPickChoice;"));

    // Setting a member claims the choice; reading another member checks it.
    assert!(source.contains("mData->mCurrentPickChoice = PickChoices::sOne;"));
    assert!(source.contains("if (mData->mCurrentPickChoice != PickChoices::bOne)"));

    // Parsing a member records the choice next to the dispatch arm.
    assert!(source.contains("case MessageOneData::mSOneIndex:"));

    // Serialization switches on the current choice.
    assert!(source.contains("switch (mData->mCurrentPickChoice)"));
    assert!(source.contains("case PickChoices::none:"));
}

#[test]
fn nested_messages_flatten_with_aliases() {
    let source = "message outer { message inner { required int32 x = 1; } }";
    let (_dir, header, _source) = compile("Nested.proto", source);

    // The nested class is forward-declared and defined before its parent.
    let inner_forward = position(&header, "class Outer_Inner;");
    let outer_forward = position(&header, "class Outer;");
    assert!(inner_forward < outer_forward);

    let inner_class = position(&header, "class Outer_Inner : public Protogen::ProtoMessage");
    let outer_class = position(&header, "class Outer : public Protogen::ProtoMessage");
    assert!(inner_class < outer_class);

    // The parent aliases the flattened name back to the natural one.
    assert!(header.contains("typedef Outer_Inner Inner;"));
}

#[test]
fn namespaces_mirror_the_package_path() {
    let source = "\
package abc.def;

message thing { required int32 x = 1; }
";
    let (_dir, header, source) = compile("Thing.proto", source);
    let abc = position(&header, "namespace abc");
    let def = position(&header, "namespace def");
    let class_pos = position(&header, "class Thing");
    assert!(abc < def && def < class_pos);

    // Implementations are qualified rather than reopening namespaces.
    assert!(source.contains("abc::def::Thing::parse"));
    assert!(source.contains("abc::def::Thing::serialize"));
}

#[test]
fn parse_body_implements_the_wire_format_loop() {
    let source = "\
message person {
  required string name = 1;
  optional int32 age = 2;
}
";
    let (_dir, _header, source) = compile("Wire.proto", source);

    // Length prefix, then key split into index and wire type.
    assert!(source.contains(
        "std::uint32_t length = Protogen::PrimitiveEncoding::parseVariableUnsignedInt32(pData, &lengthBytesParsed);"
    ));
    assert!(source.contains("while (remainingBytes)"));
    assert!(source.contains("std::uint32_t fieldIndex = fieldKey >> 3;"));
    assert!(source.contains("std::uint32_t fieldWireType = fieldKey & 0x07;"));

    // Declared fields dispatch by index constant.
    assert!(source.contains("case PersonData::mNameIndex:"));
    assert!(source.contains("case PersonData::mAgeIndex:"));
    assert!(source.contains("fieldBytesParsed = mData->mNameValue.parse(pData);"));

    // Unknown fields are skipped by wire type.
    assert!(source.contains("switch (fieldWireType)"));
    assert!(source.contains("fieldBytesParsed = 8;"));
    assert!(source.contains("fieldBytesParsed = fieldLengthBytesParsed + fieldLength;"));
    assert!(source.contains("fieldBytesParsed = 4;"));

    assert!(source.contains("return lengthBytesParsed + length;"));

    // Serialization length-prefixes the body, with a key for nested use.
    assert!(source.contains("if (result.empty())"));
    assert!(source.contains("else if (this->index() == 0)"));
    assert!(source.contains(
        "Protogen::PrimitiveEncoding::serializeVariableUnsignedInt32(key())"
    ));

    // Byte size accounts for the body, its length prefix, and the key.
    assert!(source.contains("result += mData->mNameValue.byteSize();"));
    assert!(source.contains(
        "result += Protogen::PrimitiveEncoding::sizeVariableUnsignedInt32(key());"
    ));
}

#[test]
fn common_runtime_header_is_written_once_per_invocation() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("First.proto");
    let second = dir.path().join("Second.proto");
    fs::write(&first, "message a { required int32 x = 1; }").unwrap();
    fs::write(&second, "message b { required int32 y = 1; }").unwrap();
    let out_dir = dir.path().join("generated");

    compile_protos(&[&first, &second], &out_dir).unwrap();

    let base = fs::read_to_string(out_dir.join("ProtoBase.protocol.h")).unwrap();
    assert!(base.contains("namespace Protogen"));
    assert!(base.contains("class ProtoMessage"));
    assert!(base.contains("#ifndef ProtoBase_h"));

    // Both schemas produced their own files.
    assert!(out_dir.join("First.protocol.h").exists());
    assert!(out_dir.join("Second.protocol.cpp").exists());
}

#[test]
fn common_runtime_header_can_be_skipped() {
    let dir = tempdir().unwrap();
    let proto = dir.path().join("Only.proto");
    fs::write(&proto, "message a { required int32 x = 1; }").unwrap();
    let out_dir = dir.path().join("generated");

    Config::new()
        .skip_common_code()
        .compile_protos(&[&proto], &out_dir)
        .unwrap();

    assert!(out_dir.join("Only.protocol.h").exists());
    assert!(!out_dir.join("ProtoBase.protocol.h").exists());
}

#[test]
fn project_name_prefixes_the_include_guard() {
    let dir = tempdir().unwrap();
    let proto = dir.path().join("Person.proto");
    fs::write(&proto, "message person { required string name = 1; }").unwrap();
    let out_dir = dir.path().join("generated");

    Config::new()
        .project_name("Demo")
        .compile_protos(&[&proto], &out_dir)
        .unwrap();

    let header = fs::read_to_string(out_dir.join("Person.protocol.h")).unwrap();
    assert!(header.contains("#ifndef Demo_Person_protocol_h"));
}

#[test]
fn imports_become_project_includes() {
    let dir = tempdir().unwrap();
    let proto = dir.path().join("Uses.proto");
    fs::write(
        &proto,
        "import \"Other.proto\";\nimport public \"Shared.proto\";\n",
    )
    .unwrap();
    let out_dir = dir.path().join("generated");
    compile_protos(&[&proto], &out_dir).unwrap();

    let header = fs::read_to_string(out_dir.join("Uses.protocol.h")).unwrap();
    assert!(header.contains("#include \"Other.protocol.h\""));
    assert!(header.contains("#include \"Shared.protocol.h\""));
}

#[test]
fn unknown_language_tag_is_reported() {
    let dir = tempdir().unwrap();
    let proto = dir.path().join("Any.proto");
    fs::write(&proto, "").unwrap();
    let err = Config::new()
        .language("Fortran")
        .compile_protos(&[&proto], dir.path().join("generated"))
        .unwrap_err();
    assert!(err.to_string().contains("Fortran"));
}

#[test]
fn generation_is_deterministic() {
    let source = "\
package demo;

enum colors { red = 0; green = 1; }

message person {
  required string name = 1;
  optional colors tint = 2 [default = red];
  oneof contact { string email = 3; uint64 phone = 4; }
  message address { required string street = 1; }
  optional address home = 5;
}
";
    let dir = tempdir().unwrap();
    let proto = dir.path().join("Person.proto");
    fs::write(&proto, source).unwrap();

    let out_one = dir.path().join("one");
    let out_two = dir.path().join("two");
    compile_protos(&[&proto], &out_one).unwrap();
    compile_protos(&[&proto], &out_two).unwrap();

    for name in [
        "Person.protocol.h",
        "Person.protocol.cpp",
        "ProtoBase.protocol.h",
    ] {
        let one = fs::read(out_one.join(name)).unwrap();
        let two = fs::read(out_two.join(name)).unwrap();
        assert_eq!(one, two, "{} differs between runs", name);
    }
}

#[test]
fn enum_and_message_fields_use_wrapper_templates() {
    let source = "\
package demo;

enum colors { red = 0; green = 1; }

message palette {
  optional colors primary = 1 [default = red];
  repeated colors all = 2;
  message swatch { required string label = 1; }
  optional swatch current = 3;
  repeated swatch history = 4;
}
";
    let (_dir, header, source) = compile("Palette.proto", source);

    assert!(header.contains("Protogen::ProtoEnum<demo::Colors> mPrimaryValue;"));
    assert!(header.contains("Protogen::ProtoEnumCollection<demo::Colors> mAllCollection;"));
    assert!(header.contains("Protogen::ProtoMessageField<demo::Palette_Swatch> mCurrentValue;"));
    assert!(header.contains(
        "Protogen::ProtoMessageCollection<demo::Palette_Swatch> mHistoryCollection;"
    ));

    // Message-category fields additionally construct owned values.
    assert!(header.contains("demo::Palette_Swatch & createNewCurrent();"));
    assert!(header.contains("demo::Palette_Swatch & addNewHistory();"));

    // The enum default is qualified in the data constructor.
    assert!(source.contains("mPrimaryValue(demo::Colors::red)"));
}
