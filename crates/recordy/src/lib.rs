#![doc = include_str!("../../../README.md")]

mod args;
mod class;
mod decorator;
mod exception;
mod field;
mod functions;
pub mod hint;
mod options;
mod py_hash;
mod record;
pub mod resolver;
pub mod synth;
pub mod tracer;
mod value;

pub use crate::{
    args::{Args, PostInit, PostInitArgs, PostInitFn},
    class::{ClassDecl, DefaultMeta, RecordMeta, RecordType},
    decorator::{Decorator, dataclass},
    exception::{ExcType, RecordError, RecordResult},
    field::{Factory, Field, FieldDefault, FieldIndices, FieldTable},
    functions::{
        AsRecordType, MAX_DATA_RECURSION_DEPTH, as_dict, as_dict_with, as_tuple, fields, is_dataclass,
        is_dataclass_instance, make_dataclass, replace, values,
    },
    hint::TypeHint,
    options::{HashPolicy, OptionsPatch, RecordOptions},
    record::{FieldValues, Record},
    synth::{Methods, Operation, SynthContext},
    tracer::{DefinitionTracer, NoopTracer, RecordingTracer, StderrTracer, TraceEvent},
    value::{CycleGuard, Dict, DictRef, ListRef, ReprGuard, Value},
};
