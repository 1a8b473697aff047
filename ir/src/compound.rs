//! Closed-form tensor-algebra builders.
//!
//! Matrices are expanded into their fixed components, so the results contain
//! only scalar arithmetic on `Indexed` nodes plus `ListTensor` assembly. The
//! same component node is reused wherever it occurs.

use std::sync::Arc;

use snafu::ensure;

use crate::error::{CrossProductShapeSnafu, NotAMatrixSnafu, Result, WideMatrixSnafu};
use crate::expr::Expr;

type Matrix = Vec<Vec<Arc<Expr>>>;

/// `a × b` for two 3-vectors.
pub fn cross_expr(a: &Arc<Expr>, b: &Arc<Expr>) -> Result<Arc<Expr>> {
    ensure!(
        a.shape().as_slice() == [3] && b.shape().as_slice() == [3],
        CrossProductShapeSnafu { lhs: a.shape().clone(), rhs: b.shape().clone() }
    );
    let ai = (0..3).map(|i| a.component(&[i])).collect::<Result<Vec<_>>>()?;
    let bi = (0..3).map(|i| b.component(&[i])).collect::<Result<Vec<_>>>()?;
    let c = |i: usize, j: usize| -> Result<Arc<Expr>> { ai[i].try_mul(&bi[j])?.try_sub(&ai[j].try_mul(&bi[i])?) };
    Expr::list_tensor([c(1, 2)?, c(2, 0)?, c(0, 1)?])
}

/// Determinant of a scalar or a matrix.
///
/// Square matrices expand by cofactors. A tall `m × n` matrix (`m > n`) gets
/// the pseudo-determinant `sqrt(det(AᵀA))`, the `n`-volume of its columns.
pub fn determinant_expr(a: &Arc<Expr>) -> Result<Arc<Expr>> {
    match a.shape().as_slice() {
        [] => Ok(a.clone()),
        &[m, n] => {
            ensure!(m >= n, WideMatrixSnafu { shape: a.shape().clone() });
            if n == 0 {
                return Ok(Expr::float(1.0));
            }
            let components = components(a, m, n)?;
            if m == n { cofactor_det(&components) } else { cofactor_det(&gram(&components, n)?)?.try_sqrt() }
        }
        _ => NotAMatrixSnafu { shape: a.shape().clone() }.fail(),
    }
}

/// Inverse of a scalar or a matrix.
///
/// Square matrices use adjugate over determinant, sharing one determinant
/// node across all entries. A tall matrix gets the pseudo-inverse
/// `(AᵀA)⁻¹Aᵀ`.
pub fn inverse_expr(a: &Arc<Expr>) -> Result<Arc<Expr>> {
    match a.shape().as_slice() {
        [] => Expr::float(1.0).try_div(a),
        &[m, n] => {
            ensure!(m >= n && n > 0, WideMatrixSnafu { shape: a.shape().clone() });
            let components = components(a, m, n)?;
            if m == n {
                return from_rows(adjugate_inverse(&components)?);
            }
            let gram_inverse = adjugate_inverse(&gram(&components, n)?)?;
            let mut rows = Vec::with_capacity(n);
            for row in &gram_inverse {
                let mut out = Vec::with_capacity(m);
                for a_row in &components {
                    out.push(sum((0..n).map(|k| row[k].try_mul(&a_row[k])))?);
                }
                rows.push(out);
            }
            from_rows(rows)
        }
        _ => NotAMatrixSnafu { shape: a.shape().clone() }.fail(),
    }
}

fn components(a: &Arc<Expr>, m: usize, n: usize) -> Result<Matrix> {
    (0..m).map(|i| (0..n).map(|j| a.component(&[i, j])).collect::<Result<Vec<_>>>()).collect()
}

/// `AᵀA` for an `m × n` component matrix.
fn gram(a: &Matrix, n: usize) -> Result<Matrix> {
    (0..n)
        .map(|r| (0..n).map(|c| sum(a.iter().map(|row| row[r].try_mul(&row[c])))).collect::<Result<Vec<_>>>())
        .collect()
}

fn sum(terms: impl Iterator<Item = Result<Arc<Expr>>>) -> Result<Arc<Expr>> {
    let mut acc: Option<Arc<Expr>> = None;
    for term in terms {
        let term = term?;
        acc = Some(match acc {
            Some(acc) => acc.try_add(&term)?,
            None => term,
        });
    }
    Ok(acc.unwrap_or_else(|| Expr::float(0.0)))
}

fn minor(a: &Matrix, row: usize, col: usize) -> Matrix {
    a.iter()
        .enumerate()
        .filter(|(r, _)| *r != row)
        .map(|(_, cells)| cells.iter().enumerate().filter(|(c, _)| *c != col).map(|(_, x)| x.clone()).collect())
        .collect()
}

fn cofactor_det(a: &Matrix) -> Result<Arc<Expr>> {
    match a.len() {
        0 => Ok(Expr::float(1.0)),
        1 => Ok(a[0][0].clone()),
        2 => a[0][0].try_mul(&a[1][1])?.try_sub(&a[0][1].try_mul(&a[1][0])?),
        n => {
            let mut det: Option<Arc<Expr>> = None;
            for j in 0..n {
                let term = a[0][j].try_mul(&cofactor_det(&minor(a, 0, j))?)?;
                det = Some(match det {
                    None => term,
                    Some(acc) if j % 2 == 0 => acc.try_add(&term)?,
                    Some(acc) => acc.try_sub(&term)?,
                });
            }
            Ok(det.unwrap_or_else(|| Expr::float(1.0)))
        }
    }
}

fn adjugate_inverse(a: &Matrix) -> Result<Matrix> {
    let n = a.len();
    if n == 1 {
        return Ok(vec![vec![Expr::float(1.0).try_div(&a[0][0])?]]);
    }
    let det = cofactor_det(a)?;
    let mut inverse = Vec::with_capacity(n);
    for i in 0..n {
        let mut row = Vec::with_capacity(n);
        for j in 0..n {
            let cofactor = cofactor_det(&minor(a, j, i))?;
            let signed = if (i + j) % 2 == 0 { cofactor } else { cofactor.neg()? };
            row.push(signed.try_div(&det)?);
        }
        inverse.push(row);
    }
    Ok(inverse)
}

fn from_rows(rows: Matrix) -> Result<Arc<Expr>> {
    let rows = rows.into_iter().map(|row| Expr::list_tensor(row)).collect::<Result<Vec<_>>>()?;
    Expr::list_tensor(rows)
}
