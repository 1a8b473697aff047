use std::sync::Arc;

use test_case::test_case;
use varform_domain::{CellType, CoordinateElement, Domain, Pullback};
use varform_ir::rewrite::RuleSet;
use varform_ir::test::eval::Tensor;
use varform_ir::{Expr, Form, GeometricQuantity as Q, Integral, IntegralType, NodeKind, Op};

use crate::error::{Error, ErrorClass};
use crate::geometry::{GeometryLowering, apply_geometry_lowering, automatic_preserve};
use crate::test::helpers::{
    Bindings, assert_all_close, assert_close, capture_warnings, count_warnings, nodes_of_kind, quantities,
};
use crate::{LoweringConfig, PreserveSet, apply_geometry_lowering_with_config};

fn lower(quantity: Q, domain: &Arc<Domain>) -> crate::Result<Arc<Expr>> {
    apply_geometry_lowering(&Expr::geometry(quantity, domain), PreserveSet::empty())
}

fn lower_preserving(quantity: Q, domain: &Arc<Domain>, preserve: PreserveSet) -> Arc<Expr> {
    apply_geometry_lowering(&Expr::geometry(quantity, domain), preserve).unwrap()
}

fn embedded(cell: CellType, gdim: usize) -> Arc<Domain> {
    Domain::lagrange(cell, 1, gdim).unwrap()
}

fn unit_tetrahedron_edges() -> Tensor {
    // Edges join vertex pairs (2,3), (1,3), (1,2), (0,3), (0,2), (0,1).
    Tensor::matrix(&[
        &[0.0, -1.0, 1.0],
        &[-1.0, 0.0, 1.0],
        &[-1.0, 1.0, 0.0],
        &[0.0, 0.0, 1.0],
        &[0.0, 1.0, 0.0],
        &[1.0, 0.0, 0.0],
    ])
}

fn identity(n: usize) -> Tensor {
    let rows: Vec<Vec<f64>> = (0..n).map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect()).collect();
    let refs: Vec<&[f64]> = rows.iter().map(Vec::as_slice).collect();
    Tensor::matrix(&refs)
}

// ============================================================================
// Rule table
// ============================================================================

#[test]
fn test_table_covers_every_kind() {
    assert!(GeometryLowering::rule_table().uncovered().is_empty());
}

#[test]
fn test_non_geometric_expression_is_untouched() {
    let domain = Domain::linear(CellType::Triangle);
    let expr = Expr::float(2.0).try_mul(&Expr::geometry(Q::QuadratureWeight, &domain)).unwrap();
    let lowered = apply_geometry_lowering(&expr, PreserveSet::empty()).unwrap();
    assert!(Arc::ptr_eq(&lowered, &expr));
}

// ============================================================================
// Jacobians
// ============================================================================

#[test]
fn test_jacobian_is_reference_grad_of_coordinates() {
    let domain = Domain::linear(CellType::Triangle);
    let lowered = lower(Q::Jacobian, &domain).unwrap();
    let Op::ReferenceGrad(x) = lowered.op() else { panic!("expected reference grad, got {lowered}") };
    assert_eq!(x.geometric_quantity(), Some(Q::SpatialCoordinate));
    assert_eq!(lowered.shape().as_slice(), &[2, 2]);
}

#[test_case(CellType::Triangle, 2, false ; "triangle in 2d")]
#[test_case(CellType::Triangle, 3, true ; "triangle in 3d")]
#[test_case(CellType::Interval, 1, false ; "interval in 1d")]
#[test_case(CellType::Interval, 2, true ; "interval in 2d")]
#[test_case(CellType::Tetrahedron, 3, false ; "tetrahedron")]
fn test_determinant_signed_only_on_manifolds(cell: CellType, gdim: usize, signed: bool) {
    let domain = embedded(cell, gdim);
    let lowered = lower(Q::JacobianDeterminant, &domain).unwrap();

    assert_eq!(quantities(&lowered).contains(&Q::CellOrientation), signed);
    if signed {
        let Op::Product(orientation, _) = lowered.op() else { panic!("expected product, got {lowered}") };
        assert_eq!(orientation.geometric_quantity(), Some(Q::CellOrientation));
    }
}

#[test]
fn test_determinant_value() {
    let domain = Domain::linear(CellType::Triangle);
    let lowered = lower(Q::JacobianDeterminant, &domain).unwrap();
    let bindings = Bindings::new().with_jacobian(Tensor::matrix(&[&[2.0, 1.0], &[1.0, 3.0]]));
    assert_close(bindings.eval_scalar(&lowered), 5.0);
}

#[test]
fn test_pseudo_determinant_of_surface() {
    let domain = embedded(CellType::Triangle, 3);
    let lowered = lower(Q::JacobianDeterminant, &domain).unwrap();
    let bindings = Bindings::new()
        .with_jacobian(Tensor::matrix(&[&[3.0, 0.0], &[0.0, 2.0], &[4.0, 0.0]]))
        .with(Q::CellOrientation, Tensor::scalar(-1.0));
    assert_close(bindings.eval_scalar(&lowered), -10.0);
}

#[test]
fn test_preserved_jacobian_feeds_determinant() {
    let domain = Domain::linear(CellType::Tetrahedron);
    let lowered = lower_preserving(Q::JacobianDeterminant, &domain, PreserveSet::only(Q::Jacobian));

    assert!(quantities(&lowered).contains(&Q::Jacobian));
    assert!(nodes_of_kind(&lowered, NodeKind::ReferenceGrad).is_empty());
    assert_ne!(lowered.geometric_quantity(), Some(Q::JacobianDeterminant));
}

#[test]
fn test_preserved_quantity_returns_same_node() {
    let domain = Domain::linear(CellType::Triangle);
    let volume = Expr::geometry(Q::CellVolume, &domain);
    let lowered = apply_geometry_lowering(&volume, PreserveSet::only(Q::CellVolume)).unwrap();
    assert!(Arc::ptr_eq(&lowered, &volume));
}

#[test]
fn test_jacobian_inverse_value() {
    let domain = Domain::linear(CellType::Triangle);
    let lowered = lower(Q::JacobianInverse, &domain).unwrap();
    let bindings = Bindings::new().with_jacobian(Tensor::matrix(&[&[2.0, 0.0], &[0.0, 4.0]]));
    assert_all_close(&bindings.eval(&lowered), &[0.5, 0.0, 0.0, 0.25]);
}

#[test]
fn test_facet_jacobian_contracts_reference_facet_jacobian() {
    let domain = Domain::linear(CellType::Triangle);
    let lowered = lower(Q::FacetJacobian, &domain).unwrap();
    assert_eq!(lowered.shape().as_slice(), &[2, 1]);

    let bindings = Bindings::new()
        .with_jacobian(Tensor::matrix(&[&[2.0, 0.0], &[0.0, 3.0]]))
        .with(Q::CellFacetJacobian, Tensor::matrix(&[&[-1.0], &[1.0]]));
    assert_all_close(&bindings.eval(&lowered), &[-2.0, 3.0]);
}

#[test]
fn test_facet_jacobian_determinant_is_not_signed() {
    let domain = embedded(CellType::Triangle, 3);
    let lowered = lower(Q::FacetJacobianDeterminant, &domain).unwrap();
    assert!(!quantities(&lowered).contains(&Q::CellOrientation));
}

#[test]
fn test_ridge_jacobian_shape() {
    let domain = Domain::linear(CellType::Tetrahedron);
    let lowered = lower(Q::RidgeJacobian, &domain).unwrap();
    assert_eq!(lowered.shape().as_slice(), &[3, 1]);
    assert!(quantities(&lowered).contains(&Q::CellRidgeJacobian));
}

fn diagonal_jacobian() -> Tensor {
    Tensor::matrix(&[&[2.0, 0.0, 0.0], &[0.0, 3.0, 0.0], &[0.0, 0.0, 4.0]])
}

#[test]
fn test_ridge_jacobian_determinant_and_inverse_values() {
    let domain = Domain::linear(CellType::Tetrahedron);
    let bindings = Bindings::new()
        .with_jacobian(diagonal_jacobian())
        .with(Q::CellRidgeJacobian, Tensor::matrix(&[&[-1.0], &[1.0], &[0.0]]));

    let ridge = lower(Q::RidgeJacobian, &domain).unwrap();
    assert_all_close(&bindings.eval(&ridge), &[-2.0, 3.0, 0.0]);

    let det = lower(Q::RidgeJacobianDeterminant, &domain).unwrap();
    assert_close(bindings.eval_scalar(&det), 13f64.sqrt());

    let inverse = lower(Q::RidgeJacobianInverse, &domain).unwrap();
    assert_eq!(inverse.shape().as_slice(), &[1, 3]);
    assert_all_close(&bindings.eval(&inverse), &[-2.0 / 13.0, 3.0 / 13.0, 0.0]);
}

#[test]
fn test_facet_jacobian_pseudo_inverse_and_determinant() {
    let domain = Domain::linear(CellType::Tetrahedron);
    let bindings = Bindings::new()
        .with_jacobian(diagonal_jacobian())
        .with(Q::CellFacetJacobian, Tensor::matrix(&[&[-1.0, -1.0], &[1.0, 0.0], &[0.0, 1.0]]));

    let det = lower(Q::FacetJacobianDeterminant, &domain).unwrap();
    assert_close(bindings.eval_scalar(&det), 244f64.sqrt());

    let inverse = lower(Q::FacetJacobianInverse, &domain).unwrap();
    assert_eq!(inverse.shape().as_slice(), &[2, 3]);
    let expected = [-32.0, 60.0, -16.0, -18.0, -12.0, 52.0].map(|v| v / 244.0);
    assert_all_close(&bindings.eval(&inverse), &expected);
}

// ============================================================================
// Coordinates
// ============================================================================

#[test]
fn test_cell_coordinate_from_affine_inverse() {
    let domain = Domain::linear(CellType::Triangle);
    let lowered = lower(Q::CellCoordinate, &domain).unwrap();
    let bindings = Bindings::new()
        .with_jacobian(Tensor::matrix(&[&[2.0, 0.0], &[0.0, 4.0]]))
        .with(Q::SpatialCoordinate, Tensor::vector(&[3.0, 5.0]))
        .with(Q::CellOrigin, Tensor::vector(&[1.0, 1.0]));
    assert_all_close(&bindings.eval(&lowered), &[1.0, 1.0]);
}

#[test]
fn test_facet_cell_coordinate_is_unsupported() {
    let domain = Domain::linear(CellType::Tetrahedron);
    let err = lower(Q::FacetCellCoordinate, &domain).unwrap_err();
    assert_eq!(err, Error::FacetCellCoordinateUnsupported);
    assert_eq!(err.class(), ErrorClass::UnsupportedGeometry);
}

#[test_case(Q::Jacobian ; "jacobian")]
#[test_case(Q::SpatialCoordinate ; "spatial coordinate")]
#[test_case(Q::CellVolume ; "cell volume")]
fn test_piola_mapped_coordinates_rejected(quantity: Q) {
    let element = CoordinateElement::builder()
        .cell(CellType::Triangle)
        .geometric_dimension(2)
        .pullback(Pullback::ContravariantPiola)
        .build()
        .unwrap();
    let domain = Domain::new(element);
    let err = lower(quantity, &domain).unwrap_err();
    assert!(matches!(err, Error::PiolaMappedCoordinates { pullback: Pullback::ContravariantPiola, .. }), "{err}");
    assert_eq!(err.class(), ErrorClass::UnsupportedGeometry);
}

// ============================================================================
// Volumes and areas
// ============================================================================

#[test]
fn test_cell_volume_of_affine_triangle() {
    let domain = Domain::linear(CellType::Triangle);
    let lowered = lower(Q::CellVolume, &domain).unwrap();
    let bindings = Bindings::new()
        .with_jacobian(Tensor::matrix(&[&[0.0, 2.0], &[3.0, 0.0]]))
        .with(Q::ReferenceCellVolume, Tensor::scalar(0.5));
    assert_close(bindings.eval_scalar(&lowered), 3.0);
}

#[test_case(1 ; "interval")]
#[test_case(2 ; "immersed interval")]
#[test_case(3 ; "interval in 3d")]
fn test_facet_area_of_interval_is_one(gdim: usize) {
    let domain = embedded(CellType::Interval, gdim);
    let lowered = lower(Q::FacetArea, &domain).unwrap();
    assert_eq!(lowered.as_const().map(|c| c.as_f64()), Some(1.0));
}

#[test]
fn test_facet_area_of_triangle() {
    let domain = Domain::linear(CellType::Triangle);
    let lowered = lower(Q::FacetArea, &domain).unwrap();
    let bindings = Bindings::new()
        .with_jacobian(identity(2))
        .with(Q::CellFacetJacobian, Tensor::matrix(&[&[-1.0], &[1.0]]))
        .with(Q::ReferenceFacetVolume, Tensor::scalar(1.0));
    assert_close(bindings.eval_scalar(&lowered), 2f64.sqrt());
}

#[test_case(Q::CellVolume, CellType::Triangle, 2 ; "volume of p2 triangle")]
#[test_case(Q::CellVolume, CellType::Quadrilateral, 1 ; "volume of q1 quadrilateral")]
#[test_case(Q::FacetArea, CellType::Tetrahedron, 2 ; "area of p2 tetrahedron")]
#[test_case(Q::MaxCellEdgeLength, CellType::Triangle, 2 ; "edge length of p2 triangle")]
#[test_case(Q::CellDiameter, CellType::Quadrilateral, 2 ; "diameter of q2 quadrilateral")]
#[test_case(Q::MinFacetEdgeLength, CellType::Hexahedron, 2 ; "facet edge length of q2 hexahedron")]
fn test_unsupported_geometry_warns_and_keeps_node(quantity: Q, cell: CellType, degree: usize) {
    let domain = Domain::lagrange(cell, degree, cell.topological_dimension()).unwrap();
    let node = Expr::geometry(quantity, &domain);

    let (lowered, warnings) = count_warnings(|| apply_geometry_lowering(&node, PreserveSet::empty()).unwrap());

    assert!(Arc::ptr_eq(&lowered, &node));
    assert_eq!(warnings, 1);
}

#[test_case(Q::CellVolume, 1, "2" ; "volume of q1 quadrilateral reports superdegree")]
#[test_case(Q::MinCellEdgeLength, 2, "2" ; "edge length of q2 quadrilateral reports subdegree")]
fn test_unsupported_geometry_warning_degree(quantity: Q, degree: usize, expected: &str) {
    let domain = Domain::lagrange(CellType::Quadrilateral, degree, 2).unwrap();
    let node = Expr::geometry(quantity, &domain);

    let (_, warnings) = capture_warnings(|| apply_geometry_lowering(&node, PreserveSet::empty()).unwrap());

    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].get("degree").map(String::as_str), Some(expected));
}

#[test]
fn test_edge_length_of_vertex_has_no_edges() {
    let domain = Domain::linear(CellType::Vertex);
    let err = lower(Q::MinCellEdgeLength, &domain).unwrap_err();
    assert_eq!(err, Error::NoEdges { quantity: Q::MinCellEdgeLength, cell: CellType::Vertex });
    assert_eq!(err.class(), ErrorClass::DegenerateInput);
}

#[test]
fn test_diameter_of_vertex_has_no_edges() {
    let domain = Domain::linear(CellType::Vertex);
    let err = lower(Q::CellDiameter, &domain).unwrap_err();
    assert!(matches!(err, Error::NoEdges { .. }), "{err}");
}

// ============================================================================
// Circumradius
// ============================================================================

#[test]
fn test_circumradius_of_3_4_5_triangle() {
    let domain = Domain::linear(CellType::Triangle);
    let lowered = lower_preserving(Q::Circumradius, &domain, PreserveSet::only(Q::CellVolume));
    let bindings = Bindings::new()
        .with(Q::CellVolume, Tensor::scalar(6.0))
        .with(Q::CellEdgeVectors, Tensor::matrix(&[&[3.0, 0.0], &[0.0, 4.0], &[3.0, -4.0]]));
    assert_close(bindings.eval_scalar(&lowered), 2.5);
}

#[test]
fn test_circumradius_of_unit_tetrahedron() {
    let domain = Domain::linear(CellType::Tetrahedron);
    let lowered = lower(Q::Circumradius, &domain).unwrap();
    let bindings = Bindings::new()
        .with_jacobian(identity(3))
        .with(Q::ReferenceCellVolume, Tensor::scalar(1.0 / 6.0))
        .with(Q::CellEdgeVectors, unit_tetrahedron_edges());
    assert_close(bindings.eval_scalar(&lowered), 3f64.sqrt() / 2.0);
}

#[test]
fn test_circumradius_of_interval_is_half_volume() {
    let domain = Domain::linear(CellType::Interval);
    let lowered = lower_preserving(Q::Circumradius, &domain, PreserveSet::only(Q::CellVolume));
    let bindings = Bindings::new().with(Q::CellVolume, Tensor::scalar(3.0));
    assert_close(bindings.eval_scalar(&lowered), 1.5);
    assert!(nodes_of_kind(&lowered, NodeKind::Sqrt).is_empty());
}

#[test_case(CellType::Triangle, 2 ; "p2 triangle")]
#[test_case(CellType::Quadrilateral, 1 ; "q1 quadrilateral")]
#[test_case(CellType::Hexahedron, 1 ; "q1 hexahedron")]
fn test_circumradius_requires_affine_simplex(cell: CellType, degree: usize) {
    let domain = Domain::lagrange(cell, degree, cell.topological_dimension()).unwrap();
    let err = lower(Q::Circumradius, &domain).unwrap_err();
    assert!(matches!(err, Error::CircumradiusNonAffine { .. }), "{err}");
    assert_eq!(err.class(), ErrorClass::DegenerateInput);
}

#[test]
fn test_circumradius_of_vertex_is_undefined() {
    let domain = Domain::linear(CellType::Vertex);
    let err = lower(Q::Circumradius, &domain).unwrap_err();
    assert_eq!(err, Error::CircumradiusUnsupportedCell { cell: CellType::Vertex });
}

// ============================================================================
// Edge lengths and diameter
// ============================================================================

#[test_case(Q::MinCellEdgeLength, 3.0 ; "min")]
#[test_case(Q::MaxCellEdgeLength, 5.0 ; "max")]
fn test_cell_edge_length_reduction(quantity: Q, expected: f64) {
    let domain = Domain::linear(CellType::Triangle);
    let lowered = lower(quantity, &domain).unwrap();
    let bindings =
        Bindings::new().with(Q::CellEdgeVectors, Tensor::matrix(&[&[3.0, 0.0], &[0.0, 4.0], &[3.0, -4.0]]));
    assert_close(bindings.eval_scalar(&lowered), expected);
}

#[test]
fn test_interval_edge_length_is_cell_volume() {
    let domain = Domain::linear(CellType::Interval);
    let lowered = lower_preserving(Q::MinCellEdgeLength, &domain, PreserveSet::only(Q::CellVolume));
    assert_eq!(lowered.geometric_quantity(), Some(Q::CellVolume));
}

#[test]
fn test_simplex_diameter_is_longest_edge() {
    let domain = Domain::linear(CellType::Triangle);
    let diameter = lower(Q::CellDiameter, &domain).unwrap();
    assert!(!quantities(&diameter).contains(&Q::CellVertices));

    let bindings =
        Bindings::new().with(Q::CellEdgeVectors, Tensor::matrix(&[&[1.0, 0.0], &[0.0, 2.0], &[1.0, -2.0]]));
    assert_close(bindings.eval_scalar(&diameter), 5f64.sqrt());
}

#[test]
fn test_quadrilateral_diameter_uses_all_vertex_pairs() {
    let domain = Domain::linear(CellType::Quadrilateral);
    let lowered = lower(Q::CellDiameter, &domain).unwrap();
    let bindings = Bindings::new()
        .with(Q::CellVertices, Tensor::matrix(&[&[0.0, 0.0], &[1.0, 0.0], &[0.0, 2.0], &[1.0, 2.0]]));
    assert_close(bindings.eval_scalar(&lowered), 5f64.sqrt());
}

#[test_case(Q::MinFacetEdgeLength, 1.0 ; "min")]
#[test_case(Q::MaxFacetEdgeLength, 2.0 ; "max")]
fn test_facet_edge_length_of_tetrahedron(quantity: Q, expected: f64) {
    let domain = Domain::linear(CellType::Tetrahedron);
    let lowered = lower(quantity, &domain).unwrap();
    let bindings = Bindings::new()
        .with(Q::FacetEdgeVectors, Tensor::matrix(&[&[1.0, 0.0, 0.0], &[0.0, 2.0, 0.0], &[0.0, 0.0, 2.0]]));
    assert_close(bindings.eval_scalar(&lowered), expected);
}

#[test_case(CellType::Interval ; "interval")]
#[test_case(CellType::Triangle ; "triangle")]
#[test_case(CellType::Quadrilateral ; "quadrilateral")]
fn test_facet_edge_length_needs_three_dimensions(cell: CellType) {
    let domain = Domain::linear(cell);
    let err = lower(Q::MaxFacetEdgeLength, &domain).unwrap_err();
    assert_eq!(err, Error::FacetEdgeLengthDimension { tdim: cell.topological_dimension() });
    assert_eq!(err.class(), ErrorClass::DegenerateInput);
}

// ============================================================================
// Normals
// ============================================================================

#[test]
fn test_cell_normal_of_surface() {
    let domain = embedded(CellType::Triangle, 3);
    let lowered = lower(Q::CellNormal, &domain).unwrap();
    let bindings = Bindings::new()
        .with_jacobian(Tensor::matrix(&[&[2.0, 0.0], &[0.0, 3.0], &[0.0, 0.0]]))
        .with(Q::CellOrientation, Tensor::scalar(1.0));
    assert_all_close(&bindings.eval(&lowered), &[0.0, 0.0, 1.0]);
}

#[test]
fn test_cell_normal_of_curve_rotates_tangent() {
    let domain = embedded(CellType::Interval, 2);
    let lowered = lower(Q::CellNormal, &domain).unwrap();
    let bindings = Bindings::new()
        .with_jacobian(Tensor::matrix(&[&[3.0], &[4.0]]))
        .with(Q::CellOrientation, Tensor::scalar(-1.0));
    assert_all_close(&bindings.eval(&lowered), &[0.8, -0.6]);
}

#[test_case(CellType::Triangle, 2 ; "flat triangle")]
#[test_case(CellType::Interval, 3 ; "interval in 3d")]
fn test_cell_normal_undefined(cell: CellType, gdim: usize) {
    let domain = embedded(cell, gdim);
    let err = lower(Q::CellNormal, &domain).unwrap_err();
    assert_eq!(err, Error::CellNormalUndefined { tdim: cell.topological_dimension(), gdim });
}

#[test]
fn test_cell_normal_of_vertex_unsupported() {
    let domain = embedded(CellType::Vertex, 1);
    let err = lower(Q::CellNormal, &domain).unwrap_err();
    assert_eq!(err, Error::CellNormalUnsupported { tdim: 0, gdim: 1 });
}

#[test]
fn test_facet_normal_of_triangle() {
    let domain = Domain::linear(CellType::Triangle);
    let lowered = lower(Q::FacetNormal, &domain).unwrap();
    assert_eq!(lowered.shape().as_slice(), &[2]);

    let bindings = Bindings::new()
        .with_jacobian(Tensor::matrix(&[&[2.0, 0.0], &[0.0, 1.0]]))
        .with(Q::ReferenceNormal, Tensor::vector(&[1.0, 1.0]));
    let norm = 1.25f64.sqrt();
    assert_all_close(&bindings.eval(&lowered), &[0.5 / norm, 1.0 / norm]);
}

#[test]
fn test_facet_normal_of_interval_uses_sign_of_reference_normal() {
    let domain = Domain::linear(CellType::Interval);
    let lowered = lower(Q::FacetNormal, &domain).unwrap();
    assert!(nodes_of_kind(&lowered, NodeKind::Sqrt).is_empty());

    let bindings = Bindings::new()
        .with_jacobian(Tensor::matrix(&[&[2.0]]))
        .with(Q::ReferenceNormal, Tensor::vector(&[-1.0]));
    assert_all_close(&bindings.eval(&lowered), &[-1.0]);
}

#[test]
fn test_facet_normal_of_immersed_interval() {
    let domain = embedded(CellType::Interval, 2);
    let lowered = lower(Q::FacetNormal, &domain).unwrap();
    let bindings = Bindings::new()
        .with_jacobian(Tensor::matrix(&[&[3.0], &[4.0]]))
        .with(Q::ReferenceNormal, Tensor::vector(&[1.0]));
    assert_all_close(&bindings.eval(&lowered), &[0.6, 0.8]);
}

// ============================================================================
// Memoization and orchestration
// ============================================================================

#[test]
fn test_shared_dependencies_built_once() {
    let domain = Domain::linear(CellType::Tetrahedron);
    let volume = Expr::geometry(Q::CellVolume, &domain);
    let radius = Expr::geometry(Q::Circumradius, &domain);
    let det = Expr::geometry(Q::JacobianDeterminant, &domain);
    let n = Expr::geometry(Q::FacetNormal, &domain).component(&[0]).unwrap();
    let expr = volume.try_add(&radius).unwrap().try_add(&det).unwrap().try_add(&n).unwrap();

    let lowered = apply_geometry_lowering(&expr, PreserveSet::empty()).unwrap();

    assert_eq!(nodes_of_kind(&lowered, NodeKind::ReferenceGrad).len(), 1);
    assert_eq!(
        lowered.toposort().iter().filter(|node| node.geometric_quantity() == Some(Q::SpatialCoordinate)).count(),
        1
    );
}

#[test]
fn test_automatic_preserve_sets() {
    assert_eq!(automatic_preserve(IntegralType::Cell), PreserveSet::only(Q::CellCoordinate));
    assert_eq!(automatic_preserve(IntegralType::InteriorFacet), PreserveSet::only(Q::CellCoordinate));
    assert_eq!(automatic_preserve(IntegralType::Custom), Q::SpatialCoordinate | Q::Jacobian);
    assert_eq!(automatic_preserve(IntegralType::Vertex), Q::SpatialCoordinate | Q::Jacobian);
}

#[test]
fn test_integral_type_extends_preserve_set() {
    let domain = Domain::linear(CellType::Triangle);
    let det = Expr::geometry(Q::JacobianDeterminant, &domain);
    let coordinate = Expr::geometry(Q::CellCoordinate, &domain).component(&[0]).unwrap();
    let integrand = det.try_mul(&coordinate).unwrap();

    let form = Form::new(vec![
        Integral::new(integrand.clone(), IntegralType::Cell, domain.clone()).unwrap(),
        Integral::new(integrand.clone(), IntegralType::Custom, domain.clone()).unwrap(),
    ]);
    let lowered = apply_geometry_lowering(&form, PreserveSet::empty()).unwrap();
    let [cell, custom] = lowered.integrals() else { panic!("expected two integrals") };

    let cell_quantities = quantities(cell.integrand());
    assert!(cell_quantities.contains(&Q::CellCoordinate));
    assert!(!nodes_of_kind(cell.integrand(), NodeKind::ReferenceGrad).is_empty());

    let custom_quantities = quantities(custom.integrand());
    assert!(!custom_quantities.contains(&Q::CellCoordinate));
    assert!(custom_quantities.contains(&Q::Jacobian));
    assert!(nodes_of_kind(custom.integrand(), NodeKind::ReferenceGrad).is_empty());
    assert_eq!(custom.integral_type(), IntegralType::Custom);
}

#[test]
fn test_errors_abort_the_whole_form() {
    let affine = Domain::linear(CellType::Triangle);
    let curved = Domain::lagrange(CellType::Triangle, 2, 2).unwrap();
    let form = Form::new(vec![
        Integral::new(Expr::geometry(Q::CellVolume, &affine), IntegralType::Cell, affine.clone()).unwrap(),
        Integral::new(Expr::geometry(Q::Circumradius, &curved), IntegralType::Cell, curved.clone()).unwrap(),
    ]);
    let err = apply_geometry_lowering(&form, PreserveSet::empty()).unwrap_err();
    assert!(matches!(err, Error::CircumradiusNonAffine { cell: CellType::Triangle, degree: 2 }), "{err}");
}

#[test]
fn test_lowering_with_config() {
    let domain = Domain::linear(CellType::Triangle);
    let volume = Expr::geometry(Q::CellVolume, &domain);
    let config = LoweringConfig::builder().preserve(PreserveSet::only(Q::CellVolume)).build();
    let lowered = apply_geometry_lowering_with_config(&volume, &config).unwrap();
    assert!(Arc::ptr_eq(&lowered, &volume));
}

#[test]
fn test_lower_memoizes_per_domain() {
    let a = Domain::linear(CellType::Triangle);
    let b = Domain::linear(CellType::Triangle);
    let mut rules = GeometryLowering::new(PreserveSet::empty());

    let first = rules.lower(Q::JacobianDeterminant, &a).unwrap();
    let again = rules.lower(Q::JacobianDeterminant, &a).unwrap();
    let other = rules.lower(Q::JacobianDeterminant, &b).unwrap();

    assert!(Arc::ptr_eq(&first, &again));
    assert!(!Arc::ptr_eq(&first, &other));
    assert!(!first.structurally_eq(&other));
}
