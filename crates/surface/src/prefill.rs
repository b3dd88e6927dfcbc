use foundation::math::LatLon;
use geocoding::{AddressResolver, ResolutionError};
use serde::Serialize;

/// Location fields handed to the event submission form after a long press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationPrefill {
    pub latitude: String,
    pub longitude: String,
    pub address: String,
}

impl LocationPrefill {
    /// Pairs `point` with its address. If the lookup fails the address reads
    /// `Location: <lat>, <lng>` so the form is never left blank.
    ///
    /// The address is the same short form the popups show, taken from the
    /// resolver's cache when present, rather than the provider's full
    /// `display_name`.
    pub async fn resolve(
        point: LatLon,
        resolver: &AddressResolver,
    ) -> Result<Self, ResolutionError> {
        let address = resolver
            .lookup(point.lat, point.lon)
            .await?
            .unwrap_or_else(|| format!("Location: {}", resolver.coordinates(point)));
        Ok(Self::with_address(point, address))
    }

    pub fn with_address(point: LatLon, address: String) -> Self {
        Self {
            latitude: point.lat.to_string(),
            longitude: point.lon.to_string(),
            address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LocationPrefill;
    use foundation::math::LatLon;
    use geocoding::{
        AddressParts, AddressResolver, BoxFuture, GeocodeError, GeocoderConfig, Place,
        ResolutionError, ReverseGeocoder, ReverseResponse,
    };
    use std::sync::Arc;

    struct FixedGeocoder(Option<&'static str>);

    impl ReverseGeocoder for FixedGeocoder {
        fn reverse(&self, _point: LatLon) -> BoxFuture<'_, Result<ReverseResponse, GeocodeError>> {
            let road = self.0;
            Box::pin(async move {
                match road {
                    Some(road) => Ok(ReverseResponse {
                        address: Some(AddressParts {
                            road: Some(road.into()),
                            village: Some("Bucha".into()),
                            ..AddressParts::default()
                        }),
                        ..ReverseResponse::default()
                    }),
                    None => Err(GeocodeError::Status(502)),
                }
            })
        }

        fn search(
            &self,
            _query: &str,
            _limit: usize,
        ) -> BoxFuture<'_, Result<Vec<Place>, GeocodeError>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    fn resolver(road: Option<&'static str>) -> AddressResolver {
        AddressResolver::new(GeocoderConfig::default(), Arc::new(FixedGeocoder(road)))
    }

    #[tokio::test]
    async fn uses_resolved_address() {
        let point = LatLon::new(50.5432, 30.2121);
        let prefill = LocationPrefill::resolve(point, &resolver(Some("Vokzalna St")))
            .await
            .unwrap();
        assert_eq!(prefill.address, "Vokzalna St, Bucha");
        assert_eq!(prefill.latitude, "50.5432");
        assert_eq!(prefill.longitude, "30.2121");
    }

    #[tokio::test]
    async fn failed_lookup_labels_coordinates() {
        let point = LatLon::new(50.5432, 30.2121);
        let prefill = LocationPrefill::resolve(point, &resolver(None)).await.unwrap();
        assert_eq!(prefill.address, "Location: 50.54320, 30.21210");
    }

    #[tokio::test]
    async fn failed_lookups_on_one_key_share_the_label() {
        let resolver = resolver(None);
        let a = LocationPrefill::resolve(LatLon::new(50.543201, 30.2121), &resolver);
        let b = LocationPrefill::resolve(LatLon::new(50.543203, 30.2121), &resolver);
        let (a, b) = tokio::join!(a, b);
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.address, b.address);
        assert_ne!(a.latitude, b.latitude);
    }

    #[tokio::test]
    async fn rejects_non_finite_points() {
        let err = LocationPrefill::resolve(LatLon::new(f64::NAN, 0.0), &resolver(None)).await;
        assert_eq!(err, Err(ResolutionError::InvalidCoordinate));
    }
}
