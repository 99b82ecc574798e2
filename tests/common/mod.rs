#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use agora::bridge::{ClassRegistry, ClassSpec, HostValue, Instances, OBJECT};
use agora::error::Error;
use agora::model::AgoraObject;
use agora::universe::Universe;


/// Host struct exposed to Agora as geometry.Point.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}


pub fn setup() -> Result<Universe, String> {
    // Integration tests will call this method multiple times; ignore the error.
    if let Err(_err) = env_logger::try_init() {}

    let registry = match registry() {
        Ok(val) => val,
        Err(err) => return Err(format!("{}", err)),
    };
    match Universe::new(registry) {
        Ok(val) => Ok(val),
        Err(err) => Err(format!("{}", err)),
    }
}

pub fn registry() -> Result<ClassRegistry, Error> {
    let point = ClassSpec::reflect::<Point>("geometry")?
        .extends(OBJECT)
        .method("moveBy", &["Integer", "Integer"], move_by)
        .static_method("origin", &[], origin)
        .constructor(&[], new_point)
        .constructor(&["Integer", "Integer"], new_point_at);
    Ok(ClassRegistry::new().with(point))
}

/// Evaluates `source` at toplevel and brings the result down.
pub fn eval(universe: &mut Universe, source: &str) -> Result<HostValue, Error> {
    universe.evaluate(source)?.down()
}

pub fn eval_object(universe: &mut Universe, source: &str) -> AgoraObject {
    match universe.evaluate(source) {
        Ok(val) => val,
        Err(err) => panic!("Evaluating {:?} failed: {}", source, err),
    }
}

pub fn text<S: Into<String>>(s: S) -> HostValue {
    HostValue::Text(s.into())
}


fn integers(op: &str, args: Vec<HostValue>) -> Result<(i64, i64), Error> {
    match args.as_slice() {
        [HostValue::Integer(a), HostValue::Integer(b)] => Ok((*a, *b)),
        _ => Err(Error::prim(op, "expected two integers")),
    }
}

fn move_by(
    instances: &mut Instances,
    receiver: Option<&HostValue>,
    args: Vec<HostValue>,
) -> Result<HostValue, Error> {
    let receiver = match receiver {
        Some(HostValue::Instance(id)) => *id,
        _ => return Err(Error::prim("moveBy", "missing receiver")),
    };
    let (dx, dy) = integers("moveBy", args)?;
    let point: Point = instances.load(HostValue::Instance(receiver))?;
    let instance = instances.get_mut(receiver)?;
    instance.set_field("x", HostValue::Integer(point.x + dx))?;
    instance.set_field("y", HostValue::Integer(point.y + dy))?;
    Ok(HostValue::Instance(receiver))
}

fn origin(
    instances: &mut Instances,
    _receiver: Option<&HostValue>,
    _args: Vec<HostValue>,
) -> Result<HostValue, Error> {
    instances.store(&Point { x: 0, y: 0 })
}

fn new_point(
    instances: &mut Instances,
    _receiver: Option<&HostValue>,
    _args: Vec<HostValue>,
) -> Result<HostValue, Error> {
    instances.store(&Point { x: 0, y: 0 })
}

fn new_point_at(
    instances: &mut Instances,
    _receiver: Option<&HostValue>,
    args: Vec<HostValue>,
) -> Result<HostValue, Error> {
    let (x, y) = integers("new", args)?;
    instances.store(&Point { x, y })
}
