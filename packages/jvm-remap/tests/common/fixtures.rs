//! Test fixtures
//!
//! A small runtime (`net/runtime/*`) mapped official → intermediary → named,
//! and a mod built against the runtime's named names.

use super::builders::{ClassBuilder, Insn, JarBuilder};
use jvm_remap::features::mapping::{read_mappings, MappingModel, MappingTable};
use jvm_remap::merge;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const RUNTIME_TINY: &str = "tiny\t2\t0\tofficial\tintermediary\tnamed
c\ta\tnet/runtime/class_1\tnet/runtime/Entity
\tm\t()V\ta\tmethod_1\ttick
\tf\tI\tb\tfield_1\tage
c\tb\tnet/runtime/class_2\tnet/runtime/Living
";

pub const MOD_TINY: &str = "tiny\t2\t0\tintermediary\tnamed
c\tcom/example/class_10\tcom/example/Mod
";

pub const ANCHOR: &str = "intermediary";

pub fn fixture_tables() -> Vec<MappingTable> {
    vec![
        read_mappings(RUNTIME_TINY.as_bytes(), "runtime.tiny").unwrap(),
        read_mappings(MOD_TINY.as_bytes(), "mod.tiny").unwrap(),
    ]
}

/// Runtime + mod mappings merged on intermediary
pub fn fixture_model() -> Arc<MappingModel> {
    Arc::new(merge(&fixture_tables(), ANCHOR).unwrap())
}

/// `com/example/Mod extends net/runtime/Living`, calling the inherited
/// `tick()` and reading the inherited `age` field, in named names.
pub fn fixture_mod_class() -> Vec<u8> {
    ClassBuilder::new("com/example/Mod", "net/runtime/Living")
        .method(
            "<init>",
            "()V",
            &[
                Insn::ALoad0,
                Insn::InvokeSpecial("net/runtime/Living", "<init>", "()V"),
                Insn::Return,
            ],
        )
        .method(
            "run",
            "()V",
            &[
                Insn::ALoad0,
                Insn::InvokeVirtual("com/example/Mod", "tick", "()V"),
                Insn::ALoad0,
                Insn::GetField("com/example/Mod", "age", "I"),
                Insn::Pop,
                Insn::Return,
            ],
        )
        .source_file("Mod.java")
        .build()
}

/// Mod jar in named names: one class, resources, a directory entry
pub fn fixture_mod_jar() -> Vec<u8> {
    JarBuilder::new()
        .stored("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\r\n\r\n")
        .dir("com/example/")
        .file("com/example/Mod.class", fixture_mod_class())
        .file("assets/example/lang/en_us.json", r#"{"item.example.thing":"Thing"}"#)
        .build()
}

/// The runtime as a named-namespace reference jar
pub fn fixture_runtime_jar() -> Vec<u8> {
    let entity = ClassBuilder::new("net/runtime/Entity", "java/lang/Object")
        .field("age", "I")
        .method("tick", "()V", &[Insn::Return])
        .build();
    let living = ClassBuilder::new("net/runtime/Living", "net/runtime/Entity").build();
    JarBuilder::new()
        .file("net/runtime/Entity.class", entity)
        .file("net/runtime/Living.class", living)
        .build()
}

/// Write `data` to `dir/name` and return the path
pub fn fixture_file(dir: &Path, name: &str, data: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}
