use pretty_assertions::assert_eq;

use super::*;

const SPECS: &str = r#"{"specs": [
	"search",
	{"name": "maps",
	 "baseSpec": {"uri": "http://maps.example.com/maps?file=api", "ssl": null,
	              "key": {"string": "key"}, "version": {"string": "v"}, "deferred": true,
	              "params": {"callback": {"regex": "callback=$1&async=2"}}},
	 "customSpecs": [
	   {"uri": "http://maps.example.com/maps/api/js", "deferred": true, "pattern": "^(3|3..*)$",
	    "params": {"callback": {"string": "callback"}}}
	 ]}
]}"#;

fn rules(catalog: &Catalog, name: &str) -> ProviderRules {
	match &catalog.resolve(name).unwrap().kind {
		ResolutionKind::Restricted(rules) => rules.clone(),
		other => panic!("expected provider rules, got {other:?}"),
	}
}

#[test]
fn bare_names_become_simple_modules() {
	let catalog = Catalog::builder().specs_json(SPECS).unwrap().build();
	let spec = catalog.resolve("search").unwrap();
	assert!(matches!(spec.kind, ResolutionKind::Simple));
	assert!(catalog.resolve("doesnotexist").is_none());
}

#[test]
fn first_matching_override_wins() {
	let catalog = Catalog::builder().specs_json(SPECS).unwrap().build();
	let rules = rules(&catalog, "maps");
	assert_eq!(rules.select("3").uri, "http://maps.example.com/maps/api/js");
	assert_eq!(rules.select("3.2").uri, "http://maps.example.com/maps/api/js");
	assert_eq!(rules.select("2").uri, "http://maps.example.com/maps?file=api");
	assert_eq!(rules.select("2.3").uri, "http://maps.example.com/maps?file=api");
}

#[test]
fn invalid_pattern_is_rejected() {
	let json = r#"{"specs": [{"name": "bad", "baseSpec": {"uri": "http://x"},
		"customSpecs": [{"uri": "http://y", "pattern": "(unclosed"}]}]}"#;
	let err = Catalog::builder().specs_json(json).unwrap_err();
	assert!(matches!(err, CatalogError::InvalidPattern { ref module, .. } if module == "bad"));
}

#[test]
fn later_spec_replaces_earlier() {
	let json = r#"{"specs": [{"name": "dup", "baseSpec": {"uri": "http://old"}}, "dup"]}"#;
	let catalog = Catalog::builder().specs_json(json).unwrap().build();
	assert!(matches!(catalog.resolve("dup").unwrap().kind, ResolutionKind::Simple));
	assert_eq!(catalog.len(), 1);
}

#[test]
fn libraries_do_not_replace_specs_and_strip_prefixes() {
	let payload: CatalogPayload = serde_json::from_str(
		r#"{
			"specs": ["jquery"],
			"libraries": {
				":jquery": {"versions": {":1.4.2": {"compressed": "jquery.min.js", "uncompressed": "jquery.js"}}},
				":dojo": {"versions": {":1.5.0": {"compressed": "dojo/dojo.xd.js", "uncompressed": "dojo/dojo.xd.js.uncompressed.js"}},
				          "aliases": {":1": "1.5.0"}}
			}
		}"#,
	)
	.unwrap();
	let catalog = Catalog::builder().payload(payload).unwrap().build();

	assert!(matches!(catalog.resolve("jquery").unwrap().kind, ResolutionKind::Simple));
	let ResolutionKind::Versioned(table) = &catalog.resolve("dojo").unwrap().kind else {
		panic!("dojo should be a hosted library");
	};
	let (canonical, files) = table.resolve("1").unwrap();
	assert_eq!(canonical, "1.5.0");
	assert_eq!(files.compressed, "dojo/dojo.xd.js");
}

#[test]
fn fast_path_keys_are_normalized() {
	let table: IndexMap<String, FastPathEntry> = serde_json::from_str(
		r#"{":search": {"versions": {":1": "1", ":1.0": "1"}, "path": "/api/search/1.0/abc/",
		    "js": "default+en_GB.I.js", "css": "default.css", "properties": {":JSHash": "abc"}}}"#,
	)
	.unwrap();
	let catalog = Catalog::builder().fast_path(table).build();
	let entry = catalog.fast_path("search").unwrap();
	assert!(entry.serves("1.0"));
	assert!(!entry.serves("2"));
	assert_eq!(entry.properties.get("JSHash").and_then(|v| v.as_str()), Some("abc"));
}

#[test]
fn builtin_catalog_loads() {
	let catalog = Catalog::builtin().unwrap();
	assert!(matches!(catalog.resolve("search").unwrap().kind, ResolutionKind::Simple));
	assert!(matches!(catalog.resolve("maps").unwrap().kind, ResolutionKind::Restricted(_)));
	assert!(matches!(catalog.resolve("jqueryui").unwrap().kind, ResolutionKind::Versioned(_)));
	assert!(catalog.fast_path("search").is_some());
}
