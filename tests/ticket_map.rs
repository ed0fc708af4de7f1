pub mod common;

#[tokio::test]
async fn places_tickets_with_coordinates() {
    let base = common::spawn().await;
    let map = common::Client::new(&base)
        .auth("admin", "admin123")
        .await
        .get_map("")
        .await
        .unwrap();

    let ids = map
        .markers
        .iter()
        .map(|m| m.request_num.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, ["00123", "00125"]);
    assert_eq!(map.skipped, 1);
    assert_eq!(map.markers[0].latitude, 40.1);
    assert_eq!(map.markers[0].longitude, -75.2);
}

#[tokio::test]
async fn map_follows_filters() {
    let base = common::spawn().await;
    let map = common::Client::new(&base)
        .auth("asmith", "x")
        .await
        .get_map("")
        .await
        .unwrap();

    assert_eq!(map.markers.len(), 1);
    assert_eq!(map.markers[0].request_num.as_str(), "00125");
    assert_eq!(map.skipped, 1);
}
