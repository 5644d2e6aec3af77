//! 1D shape functions for centerline and triad field interpolation.
//!
//! Lagrange polynomials of order 1..4 use the standard line-element node
//! layout with the vertex nodes first: line3 at (-1, 1, 0), line4 at
//! (-1, 1, -1/3, 1/3), line5 at (-1, 1, -1/2, 0, 1/2). Cubic Hermite
//! functions interpolate value and arc-length derivative at the two end
//! nodes; the tangent functions carry the element reference length so that
//! tangent degrees of freedom are derivatives with respect to arc length.

/// Parametric node positions for an n-node Lagrange line element.
pub fn lagrange_node_positions(nnode: usize) -> &'static [f64] {
    match nnode {
        2 => &[-1.0, 1.0],
        3 => &[-1.0, 1.0, 0.0],
        4 => &[-1.0, 1.0, -1.0 / 3.0, 1.0 / 3.0],
        5 => &[-1.0, 1.0, -0.5, 0.0, 0.5],
        _ => panic!("unsupported Lagrange line element with {nnode} nodes"),
    }
}

/// Lagrange polynomial values at `xi`.
pub fn lagrange_values(nnode: usize, xi: f64) -> Vec<f64> {
    let xs = lagrange_node_positions(nnode);
    xs.iter()
        .enumerate()
        .map(|(i, &xi_i)| {
            xs.iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &xi_j)| (xi - xi_j) / (xi_i - xi_j))
                .product()
        })
        .collect()
}

/// First xi-derivatives of the Lagrange polynomials at `xi`.
pub fn lagrange_derivs(nnode: usize, xi: f64) -> Vec<f64> {
    let xs = lagrange_node_positions(nnode);
    xs.iter()
        .enumerate()
        .map(|(i, &xi_i)| {
            let mut sum = 0.0;
            for (k, &xi_k) in xs.iter().enumerate() {
                if k == i {
                    continue;
                }
                let mut prod = 1.0 / (xi_i - xi_k);
                for (j, &xi_j) in xs.iter().enumerate() {
                    if j != i && j != k {
                        prod *= (xi - xi_j) / (xi_i - xi_j);
                    }
                }
                sum += prod;
            }
            sum
        })
        .collect()
}

/// Cubic Hermite values at `xi`, ordered (value node 1, tangent node 1,
/// value node 2, tangent node 2).
pub fn hermite_values(xi: f64, length: f64) -> [f64; 4] {
    let l8 = length / 8.0;
    [
        0.25 * (2.0 - 3.0 * xi + xi * xi * xi),
        l8 * (1.0 - xi - xi * xi + xi * xi * xi),
        0.25 * (2.0 + 3.0 * xi - xi * xi * xi),
        l8 * (-1.0 - xi + xi * xi + xi * xi * xi),
    ]
}

/// First xi-derivatives of the cubic Hermite functions at `xi`.
pub fn hermite_derivs(xi: f64, length: f64) -> [f64; 4] {
    let l8 = length / 8.0;
    [
        0.25 * (-3.0 + 3.0 * xi * xi),
        l8 * (-1.0 - 2.0 * xi + 3.0 * xi * xi),
        0.25 * (3.0 - 3.0 * xi * xi),
        l8 * (-1.0 + 2.0 * xi + 3.0 * xi * xi),
    ]
}

/// Centerline shape function values, uniform over Lagrange (`vpernode` = 1)
/// and Hermite (`vpernode` = 2) interpolation; indexed `vpernode * node + v`.
pub fn centerline_values(nnodecl: usize, vpernode: usize, xi: f64, length: f64) -> Vec<f64> {
    match vpernode {
        1 => lagrange_values(nnodecl, xi),
        2 => hermite_values(xi, length).to_vec(),
        _ => panic!("unsupported number of interpolated values per node: {vpernode}"),
    }
}

/// Centerline shape function xi-derivatives, indexed `vpernode * node + v`.
pub fn centerline_derivs(nnodecl: usize, vpernode: usize, xi: f64, length: f64) -> Vec<f64> {
    match vpernode {
        1 => lagrange_derivs(nnodecl, xi),
        2 => hermite_derivs(xi, length).to_vec(),
        _ => panic!("unsupported number of interpolated values per node: {vpernode}"),
    }
}
