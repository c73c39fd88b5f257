use super::*;
use crate::fixtures;
use crate::memory::{MemoryCatalog, StoreOp};

fn spec() -> LocationSpec {
    LocationSpec::default()
}

fn resolver(catalog: &MemoryCatalog) -> LocationResolver<'_, MemoryCatalog> {
    LocationResolver::new(catalog, 30.0, 5.0)
}

#[tokio::test]
async fn coordinates_win_and_snap_to_nearest_area() {
    let catalog = fixtures::catalog();
    let location = resolver(&catalog)
        .resolve(&LocationSpec {
            latitude: Some(22.7530),
            longitude: Some(75.8930),
            city: Some("Bhopal".to_string()),
            ..spec()
        })
        .await
        .unwrap();

    assert_eq!(location.source, LocationSource::DirectCoordinates);
    assert!((location.coordinates.latitude() - 22.7530).abs() < 1e-9);
    assert_eq!(location.area_name(), Some("Vijay Nagar"));
    assert_eq!(location.city_name(), Some("Indore"));
}

#[tokio::test]
async fn remote_coordinates_resolve_without_city() {
    let catalog = fixtures::catalog();
    let location = resolver(&catalog)
        .resolve(&LocationSpec {
            latitude: Some(19.0760),
            longitude: Some(72.8777),
            ..spec()
        })
        .await
        .unwrap();

    assert_eq!(location.source, LocationSource::DirectCoordinates);
    assert!(location.area.is_none());
    assert!(location.city.is_none());
}

#[tokio::test]
async fn coordinates_past_area_snap_attach_city_only() {
    let catalog = fixtures::catalog();
    // About 11 km west of Rajwada, the closest area; still inside Indore's snap radius.
    let location = resolver(&catalog)
        .resolve(&LocationSpec {
            latitude: Some(22.7196),
            longitude: Some(75.75),
            ..spec()
        })
        .await
        .unwrap();

    assert!(location.area.is_none());
    assert_eq!(location.city_name(), Some("Indore"));
}

#[tokio::test]
async fn area_id_attaches_its_city() {
    let catalog = fixtures::catalog();
    let palasia = catalog
        .areas()
        .iter()
        .find(|a| a.name == "Palasia")
        .unwrap()
        .id;

    let location = resolver(&catalog)
        .resolve(&LocationSpec {
            area_id: Some(palasia),
            ..spec()
        })
        .await
        .unwrap();

    assert_eq!(location.source, LocationSource::AreaId);
    assert_eq!(location.area_name(), Some("Palasia"));
    assert_eq!(location.city.as_ref().map(|c| c.name.as_str()), Some("Indore"));
}

#[tokio::test]
async fn unknown_area_id_is_not_found() {
    let catalog = fixtures::catalog();
    let err = resolver(&catalog)
        .resolve(&LocationSpec {
            area_id: Some(9_999),
            ..spec()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::AreaNotFound { area_id: 9_999 }));
}

#[tokio::test]
async fn city_and_area_names_resolve_case_insensitively() {
    let catalog = fixtures::catalog();
    let location = resolver(&catalog)
        .resolve(&LocationSpec {
            city: Some("indore".to_string()),
            area: Some("vijay-nagar".to_string()),
            ..spec()
        })
        .await
        .unwrap();

    assert_eq!(location.source, LocationSource::CityAreaName);
    assert_eq!(location.area_name(), Some("Vijay Nagar"));
    assert!(location.degradations.is_empty());
}

#[tokio::test]
async fn partial_area_name_matches_by_containment() {
    let catalog = fixtures::catalog();
    let location = resolver(&catalog)
        .resolve(&LocationSpec {
            city: Some("Bhopal".to_string()),
            area: Some("Arera".to_string()),
            ..spec()
        })
        .await
        .unwrap();
    assert_eq!(location.area_name(), Some("Arera Colony"));
}

#[tokio::test]
async fn unknown_area_degrades_to_city_centroid() {
    let catalog = fixtures::catalog();
    let location = resolver(&catalog)
        .resolve(&LocationSpec {
            city: Some("Indore".to_string()),
            area: Some("Atlantis".to_string()),
            ..spec()
        })
        .await
        .unwrap();

    assert_eq!(location.source, LocationSource::CityOnly);
    assert!(location.area.is_none());
    assert!((location.coordinates.latitude() - 22.7196).abs() < 1e-9);
    assert_eq!(
        location.degradations,
        vec![Degradation::AreaNotFound {
            area: "Atlantis".to_string(),
            city: "Indore".to_string(),
        }]
    );
}

#[tokio::test]
async fn unknown_city_is_not_found() {
    let catalog = fixtures::catalog();
    let err = resolver(&catalog)
        .resolve(&LocationSpec {
            city: Some("Gotham".to_string()),
            area: Some("Vijay Nagar".to_string()),
            ..spec()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::CityNotFound { ref city } if city == "Gotham"));
}

#[tokio::test]
async fn city_only_uses_centroid() {
    let catalog = fixtures::catalog();
    let location = resolver(&catalog)
        .resolve(&LocationSpec {
            city: Some("Mhow".to_string()),
            ..spec()
        })
        .await
        .unwrap();
    assert_eq!(location.source, LocationSource::CityOnly);
    assert_eq!(location.city_name(), Some("Mhow"));
}

#[tokio::test]
async fn nothing_usable_is_location_required() {
    let catalog = fixtures::catalog();
    let err = resolver(&catalog)
        .resolve(&LocationSpec {
            area: Some("Vijay Nagar".to_string()),
            ..spec()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::LocationRequired));
}

#[tokio::test]
async fn store_failures_propagate() {
    let catalog = fixtures::catalog().with_failure(StoreOp::FindCityByName);
    let err = resolver(&catalog)
        .resolve(&LocationSpec {
            city: Some("Indore".to_string()),
            ..spec()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Store(_)));
}
