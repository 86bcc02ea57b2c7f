#![no_main]

//! Fuzz target for basic container operations
//!
//! Drives registration, binding and resolution with arbitrary ids and
//! literals. Errors are fine; panics are not. Factories never resolve
//! through `get` because cycles are not detected.

use arbitrary::Arbitrary;
use di_container::{
    Bindings, Container, Definition, Factory, Parameter, TypeDescriptor, TypeRegistry, Value,
};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

struct Leaf {
    #[allow(dead_code)]
    size: i64,
}

struct Node {
    #[allow(dead_code)]
    leaf: Arc<Leaf>,
    #[allow(dead_code)]
    label: String,
}

/// Literal definitions
#[derive(Clone, Debug, Arbitrary)]
enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<i64>),
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(b),
            Literal::Int(i) => Value::Int(i),
            Literal::Str(s) => Value::Str(s),
            Literal::List(items) => Value::from(items),
        }
    }
}

/// Operations to perform on the container
#[derive(Debug, Arbitrary)]
enum ContainerOp {
    SetLiteral(String, Literal),
    SetType(String, bool),
    SetTypeName(String),
    SetFactory(String, i64),
    SetLeafFactory(String),
    SetParam(String, Literal),
    SetParamType(String),
    SetMethod(String),
    Get(String),
    Make(String),
    Has(String),
    Call(String, String),
    Autowire,
    Len,
}

fn types() -> TypeRegistry {
    let types = TypeRegistry::new();
    types.register(
        TypeDescriptor::builder::<Leaf>("Leaf")
            .constructor([Parameter::primitive("size", "int").with_default(1)], |args| {
                Ok(Leaf {
                    size: args.get("size")?,
                })
            })
            .method("noop", [], |_: &Leaf, _| Ok(()))
            .build(),
    );
    types.register(
        TypeDescriptor::builder::<Node>("Node")
            .constructor(
                [
                    Parameter::typed("leaf", "Leaf"),
                    Parameter::primitive("label", "string"),
                ],
                |args| {
                    Ok(Node {
                        leaf: args.get("leaf")?,
                        label: args.get("label")?,
                    })
                },
            )
            .build(),
    );
    types
}

fuzz_target!(|ops: Vec<ContainerOp>| {
    let container = Container::with_types(types());

    for op in ops.into_iter().take(200) {
        match op {
            ContainerOp::SetLiteral(id, literal) => {
                let _ = container.set(&id, Value::from(literal));
            }
            ContainerOp::SetType(id, node) => {
                let name = if node { "Node" } else { "Leaf" };
                let _ = container.set(&id, Definition::of_type(name));
            }
            ContainerOp::SetTypeName(name) => {
                let _ = container.set_type(&name);
            }
            ContainerOp::SetFactory(id, n) => {
                let _ = container.set(&id, Factory::new(move || n));
            }
            ContainerOp::SetLeafFactory(id) => {
                // make never runs factories, so this cannot recurse
                let _ = container.set(&id, Factory::with_container(|c| c.make("Leaf")));
            }
            ContainerOp::SetParam(name, literal) => {
                let _ = container.set_param(&name, Value::from(literal));
            }
            ContainerOp::SetParamType(name) => {
                let _ = container.set_param_type(&name);
            }
            ContainerOp::SetMethod(method) => {
                let _ = container.set_method(&method, Bindings::new());
            }
            ContainerOp::Get(id) => {
                let _ = container.get(&id);
            }
            ContainerOp::Make(id) => {
                let _ = container.make(&id);
            }
            ContainerOp::Has(id) => {
                let _ = container.has(&id);
            }
            ContainerOp::Call(id, method) => {
                let _ = container.call(&id, &method, Bindings::new());
            }
            ContainerOp::Autowire => {
                container.autowire();
            }
            ContainerOp::Len => {
                assert_eq!(container.len(), container.ids().len());
            }
        }
    }
});
