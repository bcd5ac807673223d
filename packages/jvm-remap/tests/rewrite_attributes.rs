//! Names carried by attributes and call sites
//!
//! Every class here is rewritten named → intermediary and back. The forward
//! class must carry the mapped names; the return trip must reproduce the
//! input byte for byte.

mod common;

use byteorder::{BigEndian, ByteOrder};
use common::*;
use jvm_remap::features::classfile::{Attribute, ClassFile, CodeAttribute, Constant};
use jvm_remap::features::classpath::{ClassInfo, ClasspathIndex, ReferenceArtifact};
use jvm_remap::features::mapping::{ClassEntry, MappingModel, MappingTable};
use jvm_remap::features::rewrite::rewrite;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn model() -> Arc<MappingModel> {
    let table = MappingTable::new("runtime.tiny", ["named", "intermediary"])
        .with_class(
            ClassEntry::new(["net/runtime/Entity", "net/runtime/class_1"])
                .with_method("()V", ["tick", "method_1"]),
        )
        .with_class(
            ClassEntry::new(["net/runtime/Action", "net/runtime/class_3"])
                .with_method("(Lnet/runtime/Entity;)V", ["run", "method_3"]),
        )
        .with_class(
            ClassEntry::new(["net/runtime/Mode", "net/runtime/class_4"])
                .with_field("Lnet/runtime/Mode;", ["FAST", "field_4"]),
        )
        .with_class(
            ClassEntry::new(["com/example/Mod", "com/example/class_10"])
                .with_method("()V", ["update", "method_10"]),
        )
        .with_class(ClassEntry::new([
            "com/example/Mod$Inner",
            "com/example/class_10$class_12",
        ]))
        .with_class(ClassEntry::new(["com/example/Mod$1", "com/example/class_10$1"]))
        .with_class(
            ClassEntry::new(["com/example/Point", "com/example/class_11"])
                .with_field("I", ["x", "field_11"]),
        );
    Arc::new(MappingModel::from_table(&table, "named").unwrap())
}

fn index(model: &Arc<MappingModel>) -> ClasspathIndex {
    ClasspathIndex::new(
        Arc::clone(model),
        vec![ReferenceArtifact::classes(
            "runtime",
            "named",
            vec![
                ClassInfo::new("net/runtime/Entity").with_method("tick", "()V"),
                ClassInfo::new("net/runtime/Action").with_method("run", "(Lnet/runtime/Entity;)V"),
            ],
        )],
    )
    .unwrap()
}

/// Forward class in intermediary names, after checking the return trip.
fn remap_and_back(original: &[u8]) -> ClassFile {
    let model = model();
    let named = model.namespace_id("named").unwrap();
    let inter = model.namespace_id("intermediary").unwrap();
    let index = index(&model);

    let forward = rewrite(original, &model, named, inter, &index).unwrap();
    let back = rewrite(&forward.bytes, &model, inter, named, &index).unwrap();
    assert_eq!(back.bytes, original, "return trip changed the class bytes");
    ClassFile::parse(&forward.bytes).unwrap()
}

fn attribute<'a>(class: &ClassFile, attributes: &'a [Attribute], name: &str) -> &'a [u8] {
    attributes
        .iter()
        .find(|a| class.pool.utf8(a.name).unwrap() == name)
        .map(|a| a.info.as_slice())
        .unwrap_or_else(|| panic!("missing {} attribute", name))
}

fn index_at(info: &[u8], offset: usize) -> u16 {
    BigEndian::read_u16(&info[offset..])
}

fn utf8_at<'c>(class: &'c ClassFile, info: &[u8], offset: usize) -> &'c str {
    class.pool.utf8(index_at(info, offset)).unwrap()
}

#[test]
fn test_lambda_call_site_takes_mapped_sam_name() {
    let original = ClassBuilder::new("com/example/Mod", "java/lang/Object")
        .method(
            "update",
            "()V",
            &[
                Insn::Lambda {
                    interface: "net/runtime/Action",
                    method: "run",
                    descriptor: "(Lnet/runtime/Entity;)V",
                    implementation: ("com/example/Mod", "lambda$update$0", "(Lnet/runtime/Entity;)V"),
                },
                Insn::Pop,
                Insn::Return,
            ],
        )
        .build();

    let class = remap_and_back(&original);
    let site = class
        .pool
        .entries()
        .find_map(|(_, constant)| match constant {
            Constant::InvokeDynamic { name_and_type, .. } => Some(*name_and_type),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        class.pool.name_and_type(site).unwrap(),
        ("method_3", "()Lnet/runtime/class_3;")
    );

    let method_types: Vec<&str> = class
        .pool
        .entries()
        .filter_map(|(_, constant)| match constant {
            Constant::MethodType { descriptor } => Some(class.pool.utf8(*descriptor).unwrap()),
            _ => None,
        })
        .collect();
    assert_eq!(method_types, vec!["(Lnet/runtime/class_1;)V"]);
}

#[test]
fn test_inner_class_simple_names_follow_mapping() {
    let original = ClassBuilder::new("com/example/Mod", "java/lang/Object")
        .inner_class("com/example/Mod$Inner", Some("com/example/Mod"), Some("Inner"))
        .inner_class("com/example/Mod$1", None, None)
        .build();

    let class = remap_and_back(&original);
    let info = attribute(&class, &class.attributes, "InnerClasses");
    assert_eq!(index_at(info, 0), 2);
    assert_eq!(
        class.pool.class_name(index_at(info, 2)).unwrap(),
        "com/example/class_10$class_12"
    );
    assert_eq!(class.pool.class_name(index_at(info, 4)).unwrap(), "com/example/class_10");
    assert_eq!(utf8_at(&class, info, 6), "class_12");

    // anonymous entry: renamed class, no outer, no simple name
    assert_eq!(class.pool.class_name(index_at(info, 10)).unwrap(), "com/example/class_10$1");
    assert_eq!(index_at(info, 12), 0);
    assert_eq!(index_at(info, 14), 0);
}

#[test]
fn test_enclosing_method_reference_is_renamed() {
    let original = ClassBuilder::new("com/example/Mod$1", "java/lang/Object")
        .enclosing_method("com/example/Mod", Some(("update", "()V")))
        .inner_class("com/example/Mod$1", None, None)
        .build();

    let class = remap_and_back(&original);
    assert_eq!(class.name().unwrap(), "com/example/class_10$1");
    let info = attribute(&class, &class.attributes, "EnclosingMethod");
    assert_eq!(class.pool.class_name(index_at(info, 0)).unwrap(), "com/example/class_10");
    assert_eq!(
        class.pool.name_and_type(index_at(info, 2)).unwrap(),
        ("method_10", "()V")
    );
}

#[test]
fn test_record_components_match_their_fields() {
    let original = ClassBuilder::new("com/example/Point", "java/lang/Record")
        .record_component("x", "I")
        .record_component("owner", "Lnet/runtime/Entity;")
        .build();

    let class = remap_and_back(&original);
    let fields: Vec<(&str, &str)> = class
        .fields
        .iter()
        .map(|f| {
            (
                class.pool.utf8(f.name).unwrap(),
                class.pool.utf8(f.descriptor).unwrap(),
            )
        })
        .collect();
    assert_eq!(
        fields,
        vec![("field_11", "I"), ("owner", "Lnet/runtime/class_1;")]
    );

    let info = attribute(&class, &class.attributes, "Record");
    assert_eq!(index_at(info, 0), 2);
    assert_eq!(utf8_at(&class, info, 2), "field_11");
    assert_eq!(utf8_at(&class, info, 4), "I");
    assert_eq!(utf8_at(&class, info, 8), "owner");
    assert_eq!(utf8_at(&class, info, 10), "Lnet/runtime/class_1;");
}

#[test]
fn test_local_variable_tables_are_remapped() {
    let original = ClassBuilder::new("com/example/Mod", "java/lang/Object")
        .method_with_locals(
            "update",
            "()V",
            &[Insn::Return],
            &[
                Local {
                    name: "this",
                    descriptor: "Lcom/example/Mod;",
                    signature: None,
                },
                Local {
                    name: "targets",
                    descriptor: "Ljava/util/List;",
                    signature: Some("Ljava/util/List<Lnet/runtime/Entity;>;"),
                },
            ],
        )
        .build();

    let class = remap_and_back(&original);
    assert_eq!(class.pool.utf8(class.methods[0].name).unwrap(), "method_10");
    let code_info = attribute(&class, &class.methods[0].attributes, "Code");
    let code = CodeAttribute::parse(code_info).unwrap();

    let lvt = attribute(&class, &code.attributes, "LocalVariableTable");
    assert_eq!(index_at(lvt, 0), 2);
    assert_eq!(utf8_at(&class, lvt, 6), "this");
    assert_eq!(utf8_at(&class, lvt, 8), "Lcom/example/class_10;");
    assert_eq!(utf8_at(&class, lvt, 16), "targets");
    assert_eq!(utf8_at(&class, lvt, 18), "Ljava/util/List;");

    let lvtt = attribute(&class, &code.attributes, "LocalVariableTypeTable");
    assert_eq!(index_at(lvtt, 0), 1);
    assert_eq!(utf8_at(&class, lvtt, 6), "targets");
    assert_eq!(
        utf8_at(&class, lvtt, 8),
        "Ljava/util/List<Lnet/runtime/class_1;>;"
    );
    assert_eq!(index_at(lvtt, 10), 1);
}

#[test]
fn test_annotation_enum_constants_and_class_literals() {
    let original = ClassBuilder::new("com/example/Mod", "java/lang/Object")
        .annotation(
            "Lnet/runtime/Marker;",
            &[
                ("mode", Element::Enum("Lnet/runtime/Mode;", "FAST")),
                ("type", Element::Class("Lnet/runtime/Entity;")),
            ],
        )
        .build();

    let class = remap_and_back(&original);
    let info = attribute(&class, &class.attributes, "RuntimeVisibleAnnotations");
    // unmapped annotation type and element names stay
    assert_eq!(utf8_at(&class, info, 2), "Lnet/runtime/Marker;");
    assert_eq!(utf8_at(&class, info, 6), "mode");
    assert_eq!(info[8], b'e');
    assert_eq!(utf8_at(&class, info, 9), "Lnet/runtime/class_4;");
    assert_eq!(utf8_at(&class, info, 11), "field_4");
    assert_eq!(utf8_at(&class, info, 13), "type");
    assert_eq!(info[15], b'c');
    assert_eq!(utf8_at(&class, info, 16), "Lnet/runtime/class_1;");
}
