use diffsol::{
    ConstantOp, LinearOp, NonLinearOp, NonLinearOpJacobian, OdeEquations, OdeEquationsRef, Op,
};
use nalgebra::DVector;

use crate::kinetics::KineticParameters;

use super::{Interpolant, SinteringLaw, TemperatureProfile};

type T = f64;
type V = nalgebra::DVector<f64>;
type M = nalgebra::DMatrix<f64>;

/// Scalar densification equation `dx/dt = k(T(t)) · f(x)` in diffsol form
///
/// The parameter vector is `[Ea (kJ/mol), A (1/s)]`.
pub(crate) struct SinteringOde {
    p: Vec<f64>,
    times: Vec<f64>,
    profile: TemperatureProfile,
    law: SinteringLaw,
    gas_constant: f64,
    x0: f64,
}

impl SinteringOde {
    pub(crate) fn new(
        params: &KineticParameters,
        times: &[f64],
        profile: &TemperatureProfile,
        law: &SinteringLaw,
        gas_constant: f64,
        x0: f64,
    ) -> Self {
        SinteringOde {
            p: vec![params.ea_kj, params.a],
            times: times.to_vec(),
            profile: profile.clone(),
            law: *law,
            gas_constant,
            x0,
        }
    }

    #[inline]
    fn rate(&self, t: T) -> f64 {
        let temperature = Interpolant {
            times: &self.times,
            profile: &self.profile,
        }
        .at(t);
        KineticParameters::new(self.p[0], self.p[1]).rate(temperature, self.gas_constant)
    }
}

pub(crate) struct SinteringRhs<'a> {
    ode: &'a SinteringOde,
}

pub(crate) struct NoMass;
pub(crate) struct NoRoot;
pub(crate) struct NoOut;

pub(crate) struct InitialDensity {
    x0: f64,
}

macro_rules! scalar_op {
    ($($ty:ty),*) => {
        $(
            impl Op for $ty {
                type T = T;
                type V = V;
                type M = M;
                fn nstates(&self) -> usize {
                    1
                }
                fn nout(&self) -> usize {
                    1
                }
                fn nparams(&self) -> usize {
                    2
                }
            }
        )*
    };
}

scalar_op!(SinteringRhs<'_>, NoMass, NoRoot, NoOut, InitialDensity, SinteringOde);

impl NonLinearOp for SinteringRhs<'_> {
    fn call_inplace(&self, x: &Self::V, t: Self::T, y: &mut Self::V) {
        y[0] = self.ode.rate(t) * self.ode.law.factor(x[0]);
    }
}

impl NonLinearOpJacobian for SinteringRhs<'_> {
    fn jac_mul_inplace(&self, x: &Self::V, t: Self::T, v: &Self::V, y: &mut Self::V) {
        y[0] = self.ode.rate(t) * self.ode.law.factor_derivative(x[0]) * v[0];
    }
}

impl LinearOp for NoMass {
    fn gemv_inplace(&self, _x: &Self::V, _t: Self::T, _beta: Self::T, _y: &mut Self::V) {}
}

impl ConstantOp for InitialDensity {
    fn call_inplace(&self, _t: Self::T, y: &mut Self::V) {
        y[0] = self.x0;
    }
}

impl NonLinearOp for NoRoot {
    fn call_inplace(&self, _x: &Self::V, _t: Self::T, _y: &mut Self::V) {}
}

impl NonLinearOp for NoOut {
    fn call_inplace(&self, _x: &Self::V, _t: Self::T, _y: &mut Self::V) {}
}

impl<'b> OdeEquationsRef<'b> for SinteringOde {
    type Rhs = SinteringRhs<'b>;
    type Mass = NoMass;
    type Init = InitialDensity;
    type Root = NoRoot;
    type Out = NoOut;
}

impl OdeEquations for SinteringOde {
    fn rhs(&self) -> SinteringRhs<'_> {
        SinteringRhs { ode: self }
    }

    fn mass(&self) -> Option<NoMass> {
        None
    }

    fn init(&self) -> InitialDensity {
        InitialDensity { x0: self.x0 }
    }

    fn get_params(&self, p: &mut V) {
        p.copy_from(&DVector::from_vec(self.p.clone()));
    }

    fn root(&self) -> Option<NoRoot> {
        None
    }

    fn out(&self) -> Option<NoOut> {
        None
    }

    fn set_params(&mut self, p: &V) {
        self.p = p.iter().cloned().collect();
    }
}
