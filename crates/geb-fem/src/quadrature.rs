//! 1D quadrature rules and the integration-purpose keyed rule table for
//! Reissner beam elements.

/// A fixed 1D quadrature rule on [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussRule {
    pub points: &'static [f64],
    pub weights: &'static [f64],
}

impl GaussRule {
    pub fn num_points(&self) -> usize {
        self.points.len()
    }
}

const GAUSS_1: GaussRule = GaussRule {
    points: &[0.0],
    weights: &[2.0],
};

const GAUSS_2: GaussRule = GaussRule {
    points: &[-0.577_350_269_189_625_7, 0.577_350_269_189_625_7],
    weights: &[1.0, 1.0],
};

const GAUSS_3: GaussRule = GaussRule {
    points: &[-0.774_596_669_241_483_4, 0.0, 0.774_596_669_241_483_4],
    weights: &[
        0.555_555_555_555_555_6,
        0.888_888_888_888_888_9,
        0.555_555_555_555_555_6,
    ],
};

const GAUSS_4: GaussRule = GaussRule {
    points: &[
        -0.861_136_311_594_052_6,
        -0.339_981_043_584_856_3,
        0.339_981_043_584_856_3,
        0.861_136_311_594_052_6,
    ],
    weights: &[
        0.347_854_845_137_453_86,
        0.652_145_154_862_546_1,
        0.652_145_154_862_546_1,
        0.347_854_845_137_453_86,
    ],
};

const GAUSS_5: GaussRule = GaussRule {
    points: &[
        -0.906_179_845_938_664,
        -0.538_469_310_105_683_1,
        0.0,
        0.538_469_310_105_683_1,
        0.906_179_845_938_664,
    ],
    weights: &[
        0.236_926_885_056_189_08,
        0.478_628_670_499_366_47,
        0.568_888_888_888_888_9,
        0.478_628_670_499_366_47,
        0.236_926_885_056_189_08,
    ],
};

const LOBATTO_3: GaussRule = GaussRule {
    points: &[-1.0, 0.0, 1.0],
    weights: &[1.0 / 3.0, 4.0 / 3.0, 1.0 / 3.0],
};

/// Gauss-Legendre rule with `n` points (1..=5).
pub fn gauss_rule(n: usize) -> &'static GaussRule {
    match n {
        1 => &GAUSS_1,
        2 => &GAUSS_2,
        3 => &GAUSS_3,
        4 => &GAUSS_4,
        5 => &GAUSS_5,
        _ => panic!("unsupported Gauss rule with {n} points"),
    }
}

/// 3-point Gauss-Lobatto rule (includes the element end points).
pub fn lobatto3() -> &'static GaussRule {
    &LOBATTO_3
}

/// What a Gauss loop is integrating; each purpose owns its quadrature rule
/// and its set of reference Jacobi factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegrationPurpose {
    ElasticForce,
    ElasticMoment,
    Inertia,
    DampStoch,
    NeumannLineload,
}

/// Quadrature rule for a Reissner beam element, keyed by integration purpose.
///
/// The elastic-force rule is deliberately under-integrated relative to the
/// elastic-moment rule; this matches the integration orders required by the
/// strain-invariant formulation and must not be "corrected". The table is a
/// pure lookup with no runtime state.
pub fn beam_gauss_rule(
    purpose: IntegrationPurpose,
    num_triad_nodes: usize,
    centerline_hermite: bool,
) -> &'static GaussRule {
    match purpose {
        IntegrationPurpose::ElasticForce => {
            if centerline_hermite {
                lobatto3()
            } else {
                gauss_rule(num_triad_nodes - 1)
            }
        }
        IntegrationPurpose::ElasticMoment => {
            if centerline_hermite {
                gauss_rule(3)
            } else {
                gauss_rule(num_triad_nodes)
            }
        }
        IntegrationPurpose::Inertia
        | IntegrationPurpose::DampStoch
        | IntegrationPurpose::NeumannLineload => {
            if centerline_hermite {
                gauss_rule(4)
            } else {
                gauss_rule(num_triad_nodes)
            }
        }
    }
}
