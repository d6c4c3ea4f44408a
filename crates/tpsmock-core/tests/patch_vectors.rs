//! Endpoint patch vector tests (decode at the boundary, then merge).

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;

use tpsmock_core::{EndpointConfig, EndpointPatch, EndpointSeed, MockError, Registry};

use vector_loader::load;

fn seeded() -> Registry {
    let reg = Registry::new();
    reg.insert(EndpointSeed {
        id: "vec".into(),
        name: "Vector Hook".into(),
        path: Some("/vectors".into()),
        config: EndpointConfig {
            headers: HashMap::from([("X-Seed".to_string(), "1".to_string())]),
            ..Default::default()
        },
    })
    .unwrap();
    reg
}

#[test]
fn patch_vectors() {
    let files = [
        "patch_status_only.json",
        "patch_explicit_zero.json",
        "patch_headers_merge.json",
        "patch_path_normalized.json",
        "patch_bad_status.json",
        "patch_unknown_field.json",
        "patch_negative_timeout.json",
    ];

    for f in files {
        let v = load(f);
        let reg = seeded();
        let before = reg.get("vec").unwrap();

        let res = serde_json::from_value::<EndpointPatch>(v.patch.clone())
            .map_err(|e| MockError::InvalidConfig(e.to_string()))
            .and_then(|patch| reg.update("vec", patch));

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.client_code().as_str(), err.code, "vector={}", v.description);

            // Rejected patches leave the endpoint untouched.
            let after = reg.get("vec").unwrap();
            assert_eq!(after.config, before.config, "vector={}", v.description);
            assert_eq!(after.path, before.path, "vector={}", v.description);
            continue;
        }

        let ep = res.expect("expected ok endpoint");
        let ex = v.expect.expect("missing expect block");
        let got = serde_json::to_value(&ep).unwrap();

        assert_eq!(got["name"], ex["name"], "vector={}", v.description);
        assert_eq!(got["path"], ex["path"], "vector={}", v.description);
        assert_eq!(got["config"], ex["config"], "vector={}", v.description);
        assert_eq!(got["id"], "vec", "vector={}", v.description);
    }
}
