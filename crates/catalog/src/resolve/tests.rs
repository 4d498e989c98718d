use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::Catalog;

fn builtin() -> Catalog {
	Catalog::builtin().unwrap()
}

fn callback_params(entry: &str) -> UrlParams {
	UrlParams {
		callback: Some(entry.to_string()),
		..UrlParams::default()
	}
}

#[test]
fn simple_first_load_url() {
	let endpoints = Endpoints::default();
	let resolver = UrlResolver::new(&endpoints);
	let params = UrlParams {
		language: Some("en".to_string()),
		packages: vec!["piechart".to_string(), "areachart".to_string()],
		callback: Some(String::new()),
		..UrlParams::default()
	};
	assert_eq!(
		resolver.simple_url("visualization", "1", &params, None),
		"http://www.google.com/uds/?file=visualization&v=1&hl=en&packages=areachart%2Cpiechart&async=2"
	);
}

#[test]
fn simple_reload_reports_have_and_signature() {
	let endpoints = Endpoints {
		additional_params: "&client=test".to_string(),
		..Endpoints::default()
	};
	let resolver = UrlResolver::new(&endpoints);
	let history = LoadHistory {
		have: vec!["default".to_string(), "table".to_string()],
		signature: Some("ff53".to_string()),
	};
	let params = UrlParams {
		nocss: Some(true),
		style: Some("compact".to_string()),
		other_params: Some("foo=bar".to_string()),
		..UrlParams::default()
	};
	assert_eq!(
		resolver.simple_url("search", "1.0", &params, Some(&history)),
		"http://www.google.com/uds/?file=search&v=1.0&client=test&output=nocss%3Dtrue&style=compact&foo=bar&sig=ff53&have=default%2Ctable"
	);
}

#[rstest]
#[case::canonical("1.4.2", false, "http://ajax.googleapis.com/ajax/libs/jquery/1.4.2/jquery.min.js")]
#[case::alias("1", false, "http://ajax.googleapis.com/ajax/libs/jquery/1.4.2/jquery.min.js")]
#[case::minor_alias("1.3", true, "http://ajax.googleapis.com/ajax/libs/jquery/1.3.2/jquery.js")]
fn library_urls(#[case] version: &str, #[case] uncompressed: bool, #[case] expected: &str) {
	let catalog = builtin();
	let endpoints = Endpoints::default();
	let params = UrlParams {
		uncompressed,
		..UrlParams::default()
	};
	let url = UrlResolver::new(&endpoints)
		.build_url(catalog.resolve("jquery").unwrap(), version, &params, None)
		.unwrap();
	assert_eq!(url, expected);
}

#[test]
fn unknown_library_version_fails() {
	let catalog = builtin();
	let endpoints = Endpoints::default();
	let err = UrlResolver::new(&endpoints)
		.build_url(catalog.resolve("jquery").unwrap(), "99.9", &UrlParams::default(), None)
		.unwrap_err();
	assert_eq!(
		err,
		ResolveError::VersionNotFound {
			module: "jquery".to_string(),
			version: "99.9".to_string()
		}
	);
}

#[test]
fn maps_v2_uses_base_rule_with_rewrite_callback() {
	let catalog = builtin();
	let endpoints = Endpoints::default();
	let url = UrlResolver::new(&endpoints)
		.build_url(catalog.resolve("maps").unwrap(), "2", &callback_params("google.loader.callbacks.maps"), None)
		.unwrap();
	assert_eq!(
		url,
		"http://maps.google.com/maps?file=googleapi&key=notsupplied&v=2&callback=google.loader.callbacks.maps&async=2"
	);
}

#[test]
fn maps_v3_selects_override() {
	let catalog = builtin();
	let endpoints = Endpoints::default();
	let url = UrlResolver::new(&endpoints)
		.build_url(catalog.resolve("maps").unwrap(), "3", &callback_params("google.loader.callbacks.maps"), None)
		.unwrap();
	assert_eq!(
		url,
		"http://maps.google.com/maps/api/js?key=notsupplied&v=3&callback=google.loader.callbacks.maps"
	);
}

#[test]
fn secure_endpoint_when_rule_defines_one() {
	let catalog = builtin();
	let endpoints = Endpoints {
		secure: true,
		..Endpoints::default()
	};
	let resolver = UrlResolver::new(&endpoints);
	let maps = resolver
		.build_url(catalog.resolve("maps").unwrap(), "3.1", &UrlParams::default(), None)
		.unwrap();
	assert!(maps.starts_with("https://maps-api-ssl.google.com/maps/api/js?"), "{maps}");

	let books = resolver
		.build_url(catalog.resolve("books").unwrap(), "0", &UrlParams::default(), None)
		.unwrap();
	assert!(books.starts_with("http://books.google.com/books/api.js?"), "{books}");
}

#[test]
fn unrecognized_params_are_dropped_and_catch_alls_kept() {
	let catalog = builtin();
	let endpoints = Endpoints::default();
	let mut params = UrlParams {
		language: Some("fr".to_string()),
		style: Some("ignored".to_string()),
		other_params: Some("sensor=false".to_string()),
		..UrlParams::default()
	};
	params.extra.insert("country".to_string(), "FR".to_string());
	let url = UrlResolver::new(&endpoints)
		.build_url(catalog.resolve("annotations").unwrap(), "1", &params, None)
		.unwrap();
	assert_eq!(
		url,
		"http://www.google.com/reviews/scripts/annotations_bootstrap.js?key=notsupplied&v=1&hl=fr&gl=FR&sensor=false"
	);
}

#[test]
fn base_domain_replaces_only_the_host() {
	let catalog = builtin();
	let endpoints = Endpoints::default();
	let params = UrlParams {
		base_domain: Some("ditu.google.cn".to_string()),
		..UrlParams::default()
	};
	let url = UrlResolver::new(&endpoints)
		.build_url(catalog.resolve("maps").unwrap(), "2", &params, None)
		.unwrap();
	assert_eq!(url, "http://ditu.google.cn/maps?file=googleapi&key=notsupplied&v=2");
}

#[test]
fn base_domain_port_is_kept() {
	let catalog = builtin();
	let endpoints = Endpoints::default();
	let params = UrlParams {
		base_domain: Some("ditu.google.cn:8080".to_string()),
		..UrlParams::default()
	};
	let url = UrlResolver::new(&endpoints)
		.build_url(catalog.resolve("books").unwrap(), "0", &params, None)
		.unwrap();
	assert_eq!(url, "http://ditu.google.cn:8080/books/api.js?key=notsupplied&v=0");
}

#[rstest]
#[case::space("bad host")]
#[case::port_not_numeric("ditu.google.cn:http")]
#[case::port_out_of_range("ditu.google.cn:70000")]
#[case::port_without_host(":8080")]
fn invalid_base_domain_is_reported(#[case] domain: &str) {
	let catalog = builtin();
	let endpoints = Endpoints::default();
	let params = UrlParams {
		base_domain: Some(domain.to_string()),
		..UrlParams::default()
	};
	let err = UrlResolver::new(&endpoints)
		.build_url(catalog.resolve("maps").unwrap(), "2", &params, None)
		.unwrap_err();
	assert!(matches!(err, ResolveError::InvalidBaseDomain { .. }), "{domain}: {err:?}");
}

#[test]
fn fast_path_assets_join_service_base() {
	let catalog = builtin();
	let endpoints = Endpoints::default();
	let assets = UrlResolver::new(&endpoints).fast_path_assets(catalog.fast_path("search").unwrap());
	assert_eq!(
		assets.script,
		"http://www.google.com/uds/api/search/1.0/ff53d47d54aee6066d3c78cea895cae9/default+en_GB.I.js"
	);
	assert_eq!(
		assets.stylesheet.as_deref(),
		Some("http://www.google.com/uds/api/search/1.0/ff53d47d54aee6066d3c78cea895cae9/default.css")
	);
}
