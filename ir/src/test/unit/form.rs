use std::str::FromStr;
use std::sync::Arc;

use strum::IntoEnumIterator;
use test_case::test_case;

use crate::error::Error;
use crate::form::SubdomainId;
use crate::{CellType, Domain, Expr, Form, GeometricQuantity, Integral, IntegralType, MapIntegrands};

fn integral(domain: &Arc<Domain>, integral_type: IntegralType) -> Integral {
    Integral::new(Expr::geometry(GeometricQuantity::CellVolume, domain), integral_type, domain.clone()).unwrap()
}

#[test_case(IntegralType::InteriorFacet, true, false, false)]
#[test_case(IntegralType::InteriorFacetHoriz, true, false, false)]
#[test_case(IntegralType::InteriorFacetVert, true, false, false)]
#[test_case(IntegralType::ExteriorFacet, false, false, false)]
#[test_case(IntegralType::Cell, false, false, false)]
#[test_case(IntegralType::Custom, false, true, false)]
#[test_case(IntegralType::CutCell, false, true, false)]
#[test_case(IntegralType::Interface, false, true, false)]
#[test_case(IntegralType::Overlap, false, true, false)]
#[test_case(IntegralType::Vertex, false, false, true)]
fn test_integral_type_predicates(integral_type: IntegralType, interior: bool, custom: bool, point: bool) {
    assert_eq!(integral_type.is_interior_facet(), interior);
    assert_eq!(integral_type.is_custom(), custom);
    assert_eq!(integral_type.is_point(), point);
}

#[test]
fn test_integral_type_names_round_trip() {
    for integral_type in IntegralType::iter() {
        assert_eq!(IntegralType::from_str(integral_type.as_ref()).unwrap(), integral_type);
    }
    assert_eq!(IntegralType::CutCell.to_string(), "cutcell");
    assert_eq!(IntegralType::InteriorFacetHoriz.to_string(), "interior_facet_horiz");
}

#[test]
fn test_integrand_must_be_true_scalar() {
    let domain = Domain::linear(CellType::Triangle);
    let n = Expr::geometry(GeometricQuantity::FacetNormal, &domain);
    let err = Integral::new(n, IntegralType::ExteriorFacet, domain).unwrap_err();
    assert!(matches!(err, Error::NonScalarIntegrand { .. }));
}

#[test]
fn test_reconstruct_keeps_metadata() {
    let domain = Domain::linear(CellType::Triangle);
    let original = integral(&domain, IntegralType::InteriorFacet)
        .with_subdomain(SubdomainId::Id(3))
        .with_metadata("quadrature_degree", "2");
    let replaced = original.reconstruct(Expr::float(1.0));

    assert_eq!(replaced.integral_type(), IntegralType::InteriorFacet);
    assert_eq!(replaced.subdomain_id(), SubdomainId::Id(3));
    assert_eq!(replaced.metadata().get("quadrature_degree").map(String::as_str), Some("2"));
    assert_eq!(replaced.domain(), &domain);
    assert_eq!(replaced.integrand().as_const().map(|c| c.as_f64()), Some(1.0));
}

#[test]
fn test_map_integrands_over_form() {
    let domain = Domain::linear(CellType::Triangle);
    let form: Form = [IntegralType::Cell, IntegralType::InteriorFacet, IntegralType::ExteriorFacet]
        .into_iter()
        .map(|t| integral(&domain, t))
        .collect();

    let mut seen = Vec::new();
    let mapped = form
        .try_map_integrands(|integrand, integral| {
            seen.push(integral.map(|i| i.integral_type()));
            Ok::<_, Error>(integrand.abs())
        })
        .unwrap();

    assert_eq!(mapped.len(), 3);
    let expected = [IntegralType::Cell, IntegralType::InteriorFacet, IntegralType::ExteriorFacet];
    assert_eq!(seen, expected.map(Some).to_vec());
    assert!(mapped.integrals().iter().all(|i| i.integrand().kind() == crate::NodeKind::Abs));
    assert_eq!(mapped.integrals_by_type(IntegralType::InteriorFacet).count(), 1);
}

#[test]
fn test_map_integrands_bare_expression() {
    let expr = Expr::float(2.0);
    let mapped = expr
        .try_map_integrands(|e, integral| {
            assert!(integral.is_none());
            Ok::<_, Error>(e.neg()?)
        })
        .unwrap();
    assert_eq!(mapped.kind(), crate::NodeKind::Product);
}

#[test]
fn test_map_integrands_propagates_error() {
    let domain = Domain::linear(CellType::Triangle);
    let form = Form::new(vec![integral(&domain, IntegralType::Cell)]);
    let result = form.try_map_integrands(|_, _| Err::<Arc<Expr>, _>(Error::EmptyListTensor));
    assert!(matches!(result.unwrap_err(), Error::EmptyListTensor));
}
