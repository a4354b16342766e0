//! Specifications as seen by the binding: the runtime's specification type,
//! plus checking one against a host signature and inferring one from it.

use ren_values::Kind;

pub use ren_engine::spec::{Param, PassingMode, SpecBuilder, SpecError, Specification};

use crate::signature::{host_params, HostFunction, HostParam};
use crate::BindError;

/// Binding-side operations on [`Specification`].
pub trait SpecificationExt: Sized {
    /// Build a specification from parameter names and the host types of `fun`.
    fn infer<M, F: HostFunction<M>>(fun: &F, names: &[&str]) -> Result<Self, BindError>;

    /// Check that this specification can drive a callable with `params`.
    fn check(&self, params: &[HostParam]) -> Result<(), BindError>;
}

impl SpecificationExt for Specification {
    fn infer<M, F: HostFunction<M>>(fun: &F, names: &[&str]) -> Result<Self, BindError> {
        let params = host_params(fun);
        if names.len() != params.len() {
            return Err(BindError::Configuration(format!(
                "{} parameter names given for a function of {} arguments",
                names.len(),
                params.len()
            )));
        }
        let mut builder = Specification::builder();
        for (name, host) in names.iter().zip(&params) {
            builder = builder.param(*name, host.kinds.as_deref().unwrap_or(&[]));
        }
        Ok(builder.build()?)
    }

    fn check(&self, params: &[HostParam]) -> Result<(), BindError> {
        if self.arity() != params.len() {
            return Err(BindError::Configuration(format!(
                "specification declares {} parameters but the function takes {}",
                self.arity(),
                params.len()
            )));
        }
        for (param, host) in self.params().iter().zip(params) {
            let Some(host_kinds) = &host.kinds else {
                continue;
            };
            if param.accepts_any() {
                continue;
            }
            if !param.kinds.iter().any(|k| host_kinds.contains(k)) {
                return Err(BindError::Configuration(format!(
                    "parameter {} accepts {} but {} takes {}",
                    param.name,
                    kind_list(&param.kinds),
                    host.type_name,
                    kind_list(host_kinds)
                )));
            }
        }
        Ok(())
    }
}

fn kind_list(kinds: &[Kind]) -> String {
    let names: Vec<&str> = kinds.iter().map(|k| k.name()).collect();
    format!("[{}]", names.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ren_values::Value;

    #[test]
    fn infers_kinds_from_types() {
        let spec = Specification::infer(&|_: i64, _: String, _: Value| (), &["a", "b", "c"]).unwrap();
        assert_eq!(spec.to_string(), "a [integer!] b [string!] c");
    }

    #[test]
    fn infer_needs_one_name_per_argument() {
        let err = Specification::infer(&|_: i64| (), &["a", "b"]).unwrap_err();
        assert!(matches!(err, BindError::Configuration(_)));
    }

    #[test]
    fn check_arity_and_kinds() {
        let params = host_params(&|_: i64, _: f64| ());
        let ok = Specification::parse("a [integer!] b [integer! decimal!]").unwrap();
        assert!(ok.check(&params).is_ok());

        let loose = Specification::parse("'a :b").unwrap();
        assert!(loose.check(&params).is_ok());

        let short = Specification::parse("a").unwrap();
        assert!(matches!(short.check(&params), Err(BindError::Configuration(_))));

        let wrong = Specification::parse("a [string!] b").unwrap();
        let err = wrong.check(&params).unwrap_err();
        assert!(err.to_string().contains("parameter a accepts [string!]"));
    }
}
