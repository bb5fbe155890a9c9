//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each case names an operation, its input and token, the request the client
//! must build, a simulated backend response, and either the expected parse
//! result or the expected normalized error. Results are compared as JSON
//! values so field ordering never matters.

use afyalink_core::{
    AfyaClient, ApiError, ClientSearch, Credentials, HttpMethod, HttpRequest, HttpResponse,
    NewClient, NewEnrollment, Signup,
};
use serde::Serialize;
use serde_json::Value;

const BASE_URL: &str = "http://localhost:5000/api";

fn client() -> AfyaClient {
    AfyaClient::new(BASE_URL)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn input<T: serde::de::DeserializeOwned>(case: &Value) -> T {
    serde_json::from_value(case["input"].clone()).unwrap()
}

fn id(case: &Value, field: &str) -> u64 {
    case["input"][field].as_u64().unwrap()
}

fn build(c: &AfyaClient, case: &Value) -> Result<HttpRequest, ApiError> {
    let token = case["token"].as_str().unwrap_or_default();
    match case["operation"].as_str().unwrap() {
        "login" => c.build_login(&input::<Credentials>(case)),
        "signup" => c.build_signup(&input::<Signup>(case)),
        "logout" => c.build_logout(token),
        "list_clients" => c.build_list_clients(token),
        "search_clients" => {
            let search = ClientSearch {
                query: case["input"]["query"].as_str().map(String::from),
                page: case["input"]["page"].as_u64().map(|p| p as u32),
                per_page: case["input"]["per_page"].as_u64().map(|p| p as u32),
            };
            c.build_search_clients(&search, token)
        }
        "get_client" => c.build_get_client(id(case, "id"), token),
        "create_client" => c.build_create_client(&input::<NewClient>(case), token),
        "list_programs" => c.build_list_programs(token),
        "list_enrollments" => c.build_list_enrollments(token),
        "create_enrollment" => c.build_create_enrollment(&input::<NewEnrollment>(case), token),
        "delete_enrollment" => {
            c.build_delete_enrollment(id(case, "client_id"), id(case, "program_id"), token)
        }
        "unenroll_client" => {
            c.build_unenroll_client(id(case, "client_id"), id(case, "program_id"), token)
        }
        other => panic!("unknown operation: {other}"),
    }
}

fn as_json<T: Serialize>(result: Result<T, ApiError>) -> Result<Value, ApiError> {
    result.map(|value| serde_json::to_value(value).unwrap())
}

fn parse(c: &AfyaClient, operation: &str, response: HttpResponse) -> Result<Value, ApiError> {
    match operation {
        "login" => as_json(c.parse_login(response)),
        "signup" => as_json(c.parse_signup(response)),
        "logout" => as_json(c.parse_logout(response)),
        "list_clients" => as_json(c.parse_list_clients(response)),
        "search_clients" => as_json(c.parse_search_clients(response)),
        "get_client" => as_json(c.parse_get_client(response)),
        "create_client" => as_json(c.parse_create_client(response)),
        "list_programs" => as_json(c.parse_list_programs(response)),
        "list_enrollments" => as_json(c.parse_list_enrollments(response)),
        "create_enrollment" => as_json(c.parse_create_enrollment(response)),
        "delete_enrollment" | "unenroll_client" => as_json(c.parse_delete_enrollment(response)),
        other => panic!("unknown operation: {other}"),
    }
}

fn assert_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(
        req.method,
        parse_method(expected["method"].as_str().unwrap()),
        "{name}: method"
    );
    assert_eq!(
        req.path,
        format!("{BASE_URL}{}", expected["path"].as_str().unwrap()),
        "{name}: path"
    );

    let expected_headers: Vec<(String, String)> = expected["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (
                arr[0].as_str().unwrap().to_string(),
                arr[1].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(req.headers, expected_headers, "{name}: headers");

    match &expected["body"] {
        Value::Null => assert!(req.body.is_none(), "{name}: body should be empty"),
        body => {
            let req_body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(&req_body, body, "{name}: body");
        }
    }
}

fn assert_error(name: &str, err: &ApiError, expected: &Value) {
    assert_eq!(
        format!("{:?}", err.kind()),
        expected["kind"].as_str().unwrap(),
        "{name}: error kind"
    );
    assert_eq!(
        err.status().map(u64::from),
        expected["status"].as_u64(),
        "{name}: error status"
    );
    assert_eq!(
        err.to_string(),
        expected["message"].as_str().unwrap(),
        "{name}: error message"
    );
}

fn run_vectors(raw: &str) {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let c = client();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let operation = case["operation"].as_str().unwrap();

        // Verify build
        let req = match build(&c, case) {
            Ok(req) => req,
            Err(err) => {
                assert!(
                    case.get("simulated_response").is_none(),
                    "{name}: build failed with {err}"
                );
                assert_error(name, &err, &case["expected_error"]);
                continue;
            }
        };
        if let Some(expected_req) = case.get("expected_request") {
            assert_request(name, &req, expected_req);
        }

        // Verify parse
        let sim = &case["simulated_response"];
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().to_string(),
        };
        match parse(&c, operation, response) {
            Ok(result) => {
                assert!(
                    case.get("expected_error").is_none(),
                    "{name}: expected an error, got {result}"
                );
                assert_eq!(result, case["expected_result"], "{name}: parsed result");
            }
            Err(err) => assert_error(name, &err, &case["expected_error"]),
        }
    }
}

#[test]
fn auth_test_vectors() {
    run_vectors(include_str!("../../test-vectors/auth.json"));
}

#[test]
fn list_test_vectors() {
    run_vectors(include_str!("../../test-vectors/lists.json"));
}

#[test]
fn record_test_vectors() {
    run_vectors(include_str!("../../test-vectors/records.json"));
}
