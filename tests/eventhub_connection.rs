// tests/eventhub_connection.rs
use fintech_headline_producer::broker::connection::{sas_token, ConnectionString};
use fintech_headline_producer::broker::eventhub::EventHubConnector;
use fintech_headline_producer::broker::Connector;
use fintech_headline_producer::ProducerError;

const CS: &str = "Endpoint=sb://Demo-NS.servicebus.windows.net/;SharedAccessKeyName=RootManageSharedAccessKey;SharedAccessKey=a2V5LWJ5dGVz+/=";

#[test]
fn connection_string_parts() {
    let cs: ConnectionString = CS.parse().unwrap();
    assert_eq!(cs.host, "demo-ns.servicebus.windows.net");
    assert_eq!(cs.key_name.as_deref(), Some("RootManageSharedAccessKey"));
    assert_eq!(cs.key.as_deref(), Some("a2V5LWJ5dGVz+/="));
    assert!(cs.entity_path.is_none());
    assert_eq!(cs.resolve_entity("eh-news-headlines").unwrap(), "eh-news-headlines");
}

#[test]
fn rejected_connection_strings() {
    for bad in [
        "",
        "SharedAccessKeyName=k;SharedAccessKey=v",
        "Endpoint=sb://ns.servicebus.windows.net/",
        "Endpoint=sb://ns.servicebus.windows.net/;SharedAccessKeyName=k",
        "Endpoint=sb://;SharedAccessKeyName=k;SharedAccessKey=v",
        "garbage",
    ] {
        let err = bad.parse::<ConnectionString>().unwrap_err();
        assert!(matches!(err, ProducerError::Configuration(_)), "{bad}");
    }
}

#[test]
fn entity_path_resolution() {
    let cs: ConnectionString = format!("{CS};EntityPath=eh-a").parse().unwrap();
    assert_eq!(cs.resolve_entity("").unwrap(), "eh-a");
    assert_eq!(cs.resolve_entity("eh-a").unwrap(), "eh-a");
    assert!(cs.resolve_entity("eh-b").unwrap_err().is_configuration());

    let bare: ConnectionString = CS.parse().unwrap();
    assert!(bare.resolve_entity("  ").unwrap_err().is_configuration());
}

#[test]
fn sas_token_shape() {
    let uri = "https://demo-ns.servicebus.windows.net/eh-news-headlines";
    let t = sas_token(uri, "send", "secret", 1_700_003_600).unwrap();
    assert!(t.starts_with(
        "SharedAccessSignature sr=https%3A%2F%2Fdemo-ns.servicebus.windows.net%2Feh-news-headlines&sig="
    ));
    assert!(t.ends_with("&se=1700003600&skn=send"));

    // deterministic for the same inputs, different for another key
    assert_eq!(t, sas_token(uri, "send", "secret", 1_700_003_600).unwrap());
    assert_ne!(t, sas_token(uri, "send", "other", 1_700_003_600).unwrap());

    // the signature is url-encoded base64 of a 32-byte HMAC (44 chars before encoding)
    let sig = t.split("&sig=").nth(1).unwrap().split('&').next().unwrap();
    let decoded = urlencoding::decode(sig).unwrap();
    assert_eq!(decoded.len(), 44);
    assert!(decoded.ends_with('='));
}

#[tokio::test]
async fn connector_rejects_empty_descriptor_as_configuration() {
    let err = EventHubConnector::new()
        .connect("", "eh-news-headlines")
        .await
        .err()
        .unwrap();
    assert!(err.is_configuration());
}
