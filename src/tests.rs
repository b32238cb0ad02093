#[cfg(test)]
mod integration_tests {
    use crate::test_utils::test_utils::{
        seed_ingredient, seed_tag, setup_test_app, TEST_PNG_BASE64,
    };
    use axum::http::{header, HeaderName, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn auth(token: &str) -> (HeaderName, HeaderValue) {
        (
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Token {token}")).unwrap(),
        )
    }

    fn register_payload(username: &str, email: &str) -> Value {
        json!({
            "username": username,
            "email": email,
            "first_name": "Test",
            "last_name": "User",
            "password": "password123",
        })
    }

    async fn register(server: &TestServer, username: &str, email: &str) -> i64 {
        let response = server
            .post("/api/users/")
            .json(&register_payload(username, email))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["data"]["id"].as_i64().unwrap()
    }

    async fn login(server: &TestServer, email: &str) -> String {
        let response = server
            .post("/api/auth/token/login/")
            .json(&json!({"email": email, "password": "password123"}))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        body["auth_token"].as_str().unwrap().to_string()
    }

    async fn register_and_login(server: &TestServer, username: &str, email: &str) -> (i64, String) {
        let id = register(server, username, email).await;
        let token = login(server, email).await;
        (id, token)
    }

    fn recipe_payload(name: &str, ingredients: &[(i32, f64)], tags: &[i32], cooking_time: i32) -> Value {
        json!({
            "name": name,
            "text": "Mix everything and cook.",
            "cooking_time": cooking_time,
            "image": format!("data:image/png;base64,{TEST_PNG_BASE64}"),
            "ingredients": ingredients
                .iter()
                .map(|(id, amount)| json!({"id": id, "amount": amount}))
                .collect::<Vec<_>>(),
            "tags": tags,
        })
    }

    async fn create_recipe(server: &TestServer, token: &str, payload: &Value) -> i64 {
        let (name, value) = auth(token);
        let response = server
            .post("/api/recipes/")
            .add_header(name, value)
            .json(payload)
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["data"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_register_user() {
        let (app, _state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/users/")
            .json(&register_payload("chef", "chef@example.com"))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["username"], "chef");
        assert_eq!(body["data"]["email"], "chef@example.com");
        assert!(body["data"]["id"].as_i64().unwrap() > 0);
        // The password never appears in the response
        assert!(body["data"].get("password").is_none());
    }

    #[tokio::test]
    async fn test_register_duplicate_email_rejected() {
        let (app, _state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register(&server, "first", "same@example.com").await;

        let response = server
            .post("/api/users/")
            .json(&register_payload("second", "same@example.com"))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let (app, _state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/users/")
            .json(&json!({
                "username": "weak",
                "email": "weak@example.com",
                "first_name": "Test",
                "last_name": "User",
                "password": "short",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_token_login_and_me() {
        let (app, _state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (id, token) = register_and_login(&server, "chef", "chef@example.com").await;

        let (name, value) = auth(&token);
        let response = server.get("/api/users/me/").add_header(name, value).await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["id"].as_i64().unwrap(), id);
        assert_eq!(body["data"]["username"], "chef");
        assert_eq!(body["data"]["is_subscribed"], false);
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_rejected() {
        let (app, _state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register(&server, "chef", "chef@example.com").await;

        let response = server
            .post("/api/auth/token/login/")
            .json(&json!({"email": "chef@example.com", "password": "wrongpassword"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_me_requires_authentication() {
        let (app, _state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/api/users/me/").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let (app, _state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, token) = register_and_login(&server, "chef", "chef@example.com").await;

        let (name, value) = auth(&token);
        let response = server
            .post("/api/auth/token/logout/")
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::NO_CONTENT);

        let (name, value) = auth(&token);
        let response = server.get("/api/users/me/").add_header(name, value).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_list_tags_sorted_by_name() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        seed_tag(&state.db, "Dinner", "dinner").await;
        seed_tag(&state.db, "Breakfast", "breakfast").await;

        let response = server.get("/api/tags/").await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Breakfast", "Dinner"]);
    }

    #[tokio::test]
    async fn test_get_tag_not_found() {
        let (app, _state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/api/tags/999/").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ingredient_name_prefix_filter() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        seed_ingredient(&state.db, "Flour", "g").await;
        seed_ingredient(&state.db, "flaxseed", "g").await;
        seed_ingredient(&state.db, "salt", "g").await;

        let response = server.get("/api/ingredients/?name=fl").await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["name"].as_str().unwrap())
            .collect();
        // Case-insensitive prefix match
        assert_eq!(names, vec!["Flour", "flaxseed"]);

        let response = server.get("/api/ingredients/").await;
        let body: Value = response.json();
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_create_recipe_with_nested_sets() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (author_id, token) = register_and_login(&server, "chef", "chef@example.com").await;
        let tag = seed_tag(&state.db, "Breakfast", "breakfast").await;
        let flour = seed_ingredient(&state.db, "flour", "g").await;
        let milk = seed_ingredient(&state.db, "milk", "ml").await;

        let payload = recipe_payload(
            "Pancakes",
            &[(flour.id, 200.0), (milk.id, 300.0)],
            &[tag.id],
            20,
        );
        let (name, value) = auth(&token);
        let response = server
            .post("/api/recipes/")
            .add_header(name, value)
            .json(&payload)
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let data = &body["data"];
        assert_eq!(data["name"], "Pancakes");
        assert_eq!(data["cooking_time"], 20);
        assert_eq!(data["author"]["id"].as_i64().unwrap(), author_id);
        assert_eq!(data["tags"][0]["slug"], "breakfast");
        assert_eq!(data["ingredients"].as_array().unwrap().len(), 2);
        assert!(data["image"].as_str().unwrap().starts_with("/media/recipes/"));
        assert_eq!(data["is_favorited"], false);
        assert_eq!(data["is_in_shopping_cart"], false);

        let flour_row = data["ingredients"]
            .as_array()
            .unwrap()
            .iter()
            .find(|i| i["name"] == "flour")
            .unwrap();
        assert_eq!(flour_row["amount"].as_f64().unwrap(), 200.0);
        assert_eq!(flour_row["measurement_unit"], "g");
    }

    #[tokio::test]
    async fn test_create_recipe_requires_authentication() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let tag = seed_tag(&state.db, "Breakfast", "breakfast").await;
        let flour = seed_ingredient(&state.db, "flour", "g").await;

        let response = server
            .post("/api/recipes/")
            .json(&recipe_payload("Pancakes", &[(flour.id, 200.0)], &[tag.id], 20))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_recipe_duplicate_ingredient_rejected() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, token) = register_and_login(&server, "chef", "chef@example.com").await;
        let tag = seed_tag(&state.db, "Breakfast", "breakfast").await;
        let flour = seed_ingredient(&state.db, "flour", "g").await;

        let payload = recipe_payload(
            "Pancakes",
            &[(flour.id, 200.0), (flour.id, 100.0)],
            &[tag.id],
            20,
        );
        let (name, value) = auth(&token);
        let response = server
            .post("/api/recipes/")
            .add_header(name, value)
            .json(&payload)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_recipe_empty_ingredients_rejected() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, token) = register_and_login(&server, "chef", "chef@example.com").await;
        let tag = seed_tag(&state.db, "Breakfast", "breakfast").await;

        let payload = recipe_payload("Pancakes", &[], &[tag.id], 20);
        let (name, value) = auth(&token);
        let response = server
            .post("/api/recipes/")
            .add_header(name, value)
            .json(&payload)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_recipe_unknown_ingredient_rejected() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, token) = register_and_login(&server, "chef", "chef@example.com").await;
        let tag = seed_tag(&state.db, "Breakfast", "breakfast").await;

        let payload = recipe_payload("Pancakes", &[(9999, 200.0)], &[tag.id], 20);
        let (name, value) = auth(&token);
        let response = server
            .post("/api/recipes/")
            .add_header(name, value)
            .json(&payload)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cooking_time_bounds() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, token) = register_and_login(&server, "chef", "chef@example.com").await;
        let tag = seed_tag(&state.db, "Breakfast", "breakfast").await;
        let flour = seed_ingredient(&state.db, "flour", "g").await;

        // cooking_time = 0 must be rejected
        let payload = recipe_payload("Raw", &[(flour.id, 200.0)], &[tag.id], 0);
        let (name, value) = auth(&token);
        let response = server
            .post("/api/recipes/")
            .add_header(name, value)
            .json(&payload)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // cooking_time = 1 must succeed
        let payload = recipe_payload("Quick", &[(flour.id, 200.0)], &[tag.id], 1);
        let (name, value) = auth(&token);
        let response = server
            .post("/api/recipes/")
            .add_header(name, value)
            .json(&payload)
            .await;
        response.assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_non_author_cannot_modify_recipe() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, author_token) = register_and_login(&server, "author", "author@example.com").await;
        let (_, other_token) = register_and_login(&server, "other", "other@example.com").await;
        let tag = seed_tag(&state.db, "Breakfast", "breakfast").await;
        let flour = seed_ingredient(&state.db, "flour", "g").await;

        let recipe_id = create_recipe(
            &server,
            &author_token,
            &recipe_payload("Pancakes", &[(flour.id, 200.0)], &[tag.id], 20),
        )
        .await;

        let (name, value) = auth(&other_token);
        let response = server
            .patch(&format!("/api/recipes/{recipe_id}/"))
            .add_header(name, value)
            .json(&json!({"name": "Stolen"}))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let (name, value) = auth(&other_token);
        let response = server
            .delete(&format!("/api/recipes/{recipe_id}/"))
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        // The author can delete
        let (name, value) = auth(&author_token);
        let response = server
            .delete(&format!("/api/recipes/{recipe_id}/"))
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_update_replaces_nested_sets() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, token) = register_and_login(&server, "chef", "chef@example.com").await;
        let breakfast = seed_tag(&state.db, "Breakfast", "breakfast").await;
        let dinner = seed_tag(&state.db, "Dinner", "dinner").await;
        let flour = seed_ingredient(&state.db, "flour", "g").await;
        let milk = seed_ingredient(&state.db, "milk", "ml").await;

        let recipe_id = create_recipe(
            &server,
            &token,
            &recipe_payload("Pancakes", &[(flour.id, 200.0)], &[breakfast.id], 20),
        )
        .await;

        let (name, value) = auth(&token);
        let response = server
            .patch(&format!("/api/recipes/{recipe_id}/"))
            .add_header(name, value)
            .json(&json!({
                "ingredients": [{"id": milk.id, "amount": 500.0}],
                "tags": [dinner.id],
            }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        let data = &body["data"];

        // Replace-all semantics: the old sets are gone
        assert_eq!(data["ingredients"].as_array().unwrap().len(), 1);
        assert_eq!(data["ingredients"][0]["name"], "milk");
        assert_eq!(data["tags"].as_array().unwrap().len(), 1);
        assert_eq!(data["tags"][0]["slug"], "dinner");
        // Untouched fields survive
        assert_eq!(data["name"], "Pancakes");
    }

    #[tokio::test]
    async fn test_favorite_toggle_semantics() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, token) = register_and_login(&server, "chef", "chef@example.com").await;
        let tag = seed_tag(&state.db, "Breakfast", "breakfast").await;
        let flour = seed_ingredient(&state.db, "flour", "g").await;
        let recipe_id = create_recipe(
            &server,
            &token,
            &recipe_payload("Pancakes", &[(flour.id, 200.0)], &[tag.id], 20),
        )
        .await;

        let path = format!("/api/recipes/{recipe_id}/favorite/");

        let (name, value) = auth(&token);
        let response = server.post(&path).add_header(name, value).await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["data"]["id"].as_i64().unwrap(), recipe_id);

        // Favoriting twice is a client error
        let (name, value) = auth(&token);
        let response = server.post(&path).add_header(name, value).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let (name, value) = auth(&token);
        let response = server.delete(&path).add_header(name, value).await;
        response.assert_status(StatusCode::NO_CONTENT);

        // Unfavoriting an unfavorited recipe is a client error
        let (name, value) = auth(&token);
        let response = server.delete(&path).add_header(name, value).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_shopping_cart_toggle_semantics() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, token) = register_and_login(&server, "chef", "chef@example.com").await;
        let tag = seed_tag(&state.db, "Breakfast", "breakfast").await;
        let flour = seed_ingredient(&state.db, "flour", "g").await;
        let recipe_id = create_recipe(
            &server,
            &token,
            &recipe_payload("Pancakes", &[(flour.id, 200.0)], &[tag.id], 20),
        )
        .await;

        let path = format!("/api/recipes/{recipe_id}/shopping_cart/");

        let (name, value) = auth(&token);
        server.post(&path).add_header(name, value).await.assert_status(StatusCode::CREATED);

        let (name, value) = auth(&token);
        server.post(&path).add_header(name, value).await.assert_status(StatusCode::BAD_REQUEST);

        let (name, value) = auth(&token);
        server.delete(&path).add_header(name, value).await.assert_status(StatusCode::NO_CONTENT);

        let (name, value) = auth(&token);
        server.delete(&path).add_header(name, value).await.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_download_shopping_cart_aggregates_by_name_and_unit() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, token) = register_and_login(&server, "chef", "chef@example.com").await;
        let tag = seed_tag(&state.db, "Breakfast", "breakfast").await;
        let flour = seed_ingredient(&state.db, "flour", "g").await;
        let milk = seed_ingredient(&state.db, "milk", "ml").await;
        let salt = seed_ingredient(&state.db, "salt", "g").await;

        let first = create_recipe(
            &server,
            &token,
            &recipe_payload(
                "Pancakes",
                &[(flour.id, 200.0), (milk.id, 100.0)],
                &[tag.id],
                20,
            ),
        )
        .await;
        let second = create_recipe(
            &server,
            &token,
            &recipe_payload("Bread", &[(flour.id, 100.0), (salt.id, 5.0)], &[tag.id], 60),
        )
        .await;

        for recipe_id in [first, second] {
            let (name, value) = auth(&token);
            server
                .post(&format!("/api/recipes/{recipe_id}/shopping_cart/"))
                .add_header(name, value)
                .await
                .assert_status(StatusCode::CREATED);
        }

        let (name, value) = auth(&token);
        let response = server
            .get("/api/recipes/download_shopping_cart/")
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::OK);

        let content_type = response.header("content-type");
        assert!(content_type.to_str().unwrap().starts_with("text/plain"));
        let disposition = response.header("content-disposition");
        assert!(disposition.to_str().unwrap().contains("shopping_list.txt"));

        let text = response.text();
        assert!(text.contains("Shopping list for: chef"));
        // Quantities are summed across both cart recipes
        assert!(text.contains("flour (g) - 300"));
        assert!(text.contains("milk (ml) - 100"));
        assert!(text.contains("salt (g) - 5"));
        // Rows come out in ingredient name order
        let flour_pos = text.find("flour").unwrap();
        let milk_pos = text.find("milk").unwrap();
        let salt_pos = text.find("salt").unwrap();
        assert!(flour_pos < milk_pos);
        assert!(milk_pos < salt_pos);
    }

    #[tokio::test]
    async fn test_subscribe_semantics() {
        let (app, _state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (me_id, token) = register_and_login(&server, "reader", "reader@example.com").await;
        let (author_id, _) = register_and_login(&server, "author", "author@example.com").await;

        // Following oneself must be rejected
        let (name, value) = auth(&token);
        let response = server
            .post(&format!("/api/users/{me_id}/subscribe/"))
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // Following an unknown author is a 404
        let (name, value) = auth(&token);
        let response = server
            .post("/api/users/99999/subscribe/")
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        let path = format!("/api/users/{author_id}/subscribe/");

        let (name, value) = auth(&token);
        let response = server.post(&path).add_header(name, value).await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["data"]["id"].as_i64().unwrap(), author_id);
        assert_eq!(body["data"]["is_subscribed"], true);

        // Following twice must be rejected
        let (name, value) = auth(&token);
        let response = server.post(&path).add_header(name, value).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let (name, value) = auth(&token);
        let response = server.delete(&path).add_header(name, value).await;
        response.assert_status(StatusCode::NO_CONTENT);

        // Unfollowing again is a client error
        let (name, value) = auth(&token);
        let response = server.delete(&path).add_header(name, value).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_subscriptions_list_includes_recipes() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, reader_token) = register_and_login(&server, "reader", "reader@example.com").await;
        let (author_id, author_token) =
            register_and_login(&server, "author", "author@example.com").await;
        let tag = seed_tag(&state.db, "Breakfast", "breakfast").await;
        let flour = seed_ingredient(&state.db, "flour", "g").await;

        for n in 0..3 {
            create_recipe(
                &server,
                &author_token,
                &recipe_payload(&format!("Recipe {n}"), &[(flour.id, 100.0)], &[tag.id], 10),
            )
            .await;
        }

        let (name, value) = auth(&reader_token);
        server
            .post(&format!("/api/users/{author_id}/subscribe/"))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::CREATED);

        let (name, value) = auth(&reader_token);
        let response = server
            .get("/api/users/subscriptions/?recipes_limit=2")
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        let results = body["data"]["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["id"].as_i64().unwrap(), author_id);
        assert_eq!(results[0]["recipes_count"], 3);
        // recipes_limit truncates the embedded list, not the count
        assert_eq!(results[0]["recipes"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_recipe_pagination_defaults_and_limit() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, token) = register_and_login(&server, "chef", "chef@example.com").await;
        let tag = seed_tag(&state.db, "Breakfast", "breakfast").await;
        let flour = seed_ingredient(&state.db, "flour", "g").await;

        for n in 0..7 {
            create_recipe(
                &server,
                &token,
                &recipe_payload(&format!("Recipe {n}"), &[(flour.id, 100.0)], &[tag.id], 10),
            )
            .await;
        }

        // Default page size is 6
        let response = server.get("/api/recipes/").await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["count"], 7);
        assert_eq!(body["data"]["results"].as_array().unwrap().len(), 6);
        assert_eq!(body["data"]["pages"], 2);
        // Newest first
        assert_eq!(body["data"]["results"][0]["name"], "Recipe 6");

        // The limit parameter overrides the page size
        let response = server.get("/api/recipes/?limit=3&page=2").await;
        let body: Value = response.json();
        assert_eq!(body["data"]["results"].as_array().unwrap().len(), 3);
        assert_eq!(body["data"]["page"], 2);
        assert_eq!(body["data"]["pages"], 3);
    }

    #[tokio::test]
    async fn test_recipe_list_filters() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (first_id, first_token) = register_and_login(&server, "first", "first@example.com").await;
        let (_, second_token) = register_and_login(&server, "second", "second@example.com").await;
        let breakfast = seed_tag(&state.db, "Breakfast", "breakfast").await;
        let dinner = seed_tag(&state.db, "Dinner", "dinner").await;
        let flour = seed_ingredient(&state.db, "flour", "g").await;

        let pancakes = create_recipe(
            &server,
            &first_token,
            &recipe_payload("Pancakes", &[(flour.id, 100.0)], &[breakfast.id], 10),
        )
        .await;
        create_recipe(
            &server,
            &second_token,
            &recipe_payload("Stew", &[(flour.id, 50.0)], &[dinner.id], 90),
        )
        .await;

        // By author
        let response = server.get(&format!("/api/recipes/?author={first_id}")).await;
        let body: Value = response.json();
        assert_eq!(body["data"]["count"], 1);
        assert_eq!(body["data"]["results"][0]["name"], "Pancakes");

        // By tag slug
        let response = server.get("/api/recipes/?tags=dinner").await;
        let body: Value = response.json();
        assert_eq!(body["data"]["count"], 1);
        assert_eq!(body["data"]["results"][0]["name"], "Stew");

        // Comma-separated slugs match either tag
        let response = server.get("/api/recipes/?tags=breakfast,dinner").await;
        let body: Value = response.json();
        assert_eq!(body["data"]["count"], 2);

        // Favorites filter only applies to the authenticated caller
        let (name, value) = auth(&second_token);
        server
            .post(&format!("/api/recipes/{pancakes}/favorite/"))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::CREATED);

        let (name, value) = auth(&second_token);
        let response = server
            .get("/api/recipes/?is_favorited=1")
            .add_header(name, value)
            .await;
        let body: Value = response.json();
        assert_eq!(body["data"]["count"], 1);
        assert_eq!(body["data"]["results"][0]["name"], "Pancakes");
        assert_eq!(body["data"]["results"][0]["is_favorited"], true);
    }

    #[tokio::test]
    async fn test_get_recipe_not_found() {
        let (app, _state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/api/recipes/12345/").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_link_and_short_redirect() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, token) = register_and_login(&server, "chef", "chef@example.com").await;
        let tag = seed_tag(&state.db, "Breakfast", "breakfast").await;
        let flour = seed_ingredient(&state.db, "flour", "g").await;
        let recipe_id = create_recipe(
            &server,
            &token,
            &recipe_payload("Pancakes", &[(flour.id, 100.0)], &[tag.id], 20),
        )
        .await;

        let response = server.get(&format!("/api/recipes/{recipe_id}/get-link/")).await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        let link = body["short-link"].as_str().unwrap();
        assert!(link.starts_with("http://"));
        assert!(link.ends_with(&format!("/s/{recipe_id}")));

        let response = server.get(&format!("/s/{recipe_id}")).await;
        response.assert_status(StatusCode::TEMPORARY_REDIRECT);

        let response = server.get("/s/99999").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_avatar_upload_and_delete() {
        let (app, state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, token) = register_and_login(&server, "chef", "chef@example.com").await;

        let (name, value) = auth(&token);
        let response = server
            .put("/api/users/me/avatar/")
            .add_header(name, value)
            .json(&json!({"avatar": format!("data:image/png;base64,{TEST_PNG_BASE64}")}))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        let avatar_url = body["data"]["avatar"].as_str().unwrap().to_string();
        assert!(avatar_url.starts_with("/media/avatars/"));

        // The file landed under the media root
        let relative = avatar_url.strip_prefix("/media/").unwrap();
        assert!(state.media_root.join(relative).exists());

        let (name, value) = auth(&token);
        let response = server.get("/api/users/me/").add_header(name, value).await;
        let body: Value = response.json();
        assert_eq!(body["data"]["avatar"].as_str().unwrap(), avatar_url);

        let (name, value) = auth(&token);
        let response = server
            .delete("/api/users/me/avatar/")
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::NO_CONTENT);
        assert!(!state.media_root.join(relative).exists());
    }

    #[tokio::test]
    async fn test_set_password_requires_current() {
        let (app, _state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, token) = register_and_login(&server, "chef", "chef@example.com").await;

        let (name, value) = auth(&token);
        let response = server
            .post("/api/users/set_password/")
            .add_header(name, value)
            .json(&json!({"new_password": "evenbetterpass", "current_password": "wrong"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let (name, value) = auth(&token);
        let response = server
            .post("/api/users/set_password/")
            .add_header(name, value)
            .json(&json!({"new_password": "evenbetterpass", "current_password": "password123"}))
            .await;
        response.assert_status(StatusCode::NO_CONTENT);

        // The old password no longer logs in, the new one does
        let response = server
            .post("/api/auth/token/login/")
            .json(&json!({"email": "chef@example.com", "password": "password123"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .post("/api/auth/token/login/")
            .json(&json!({"email": "chef@example.com", "password": "evenbetterpass"}))
            .await;
        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_user_list_shows_subscription_state() {
        let (app, _state) = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (_, reader_token) = register_and_login(&server, "reader", "reader@example.com").await;
        let (author_id, _) = register_and_login(&server, "author", "author@example.com").await;

        let (name, value) = auth(&reader_token);
        server
            .post(&format!("/api/users/{author_id}/subscribe/"))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::CREATED);

        let (name, value) = auth(&reader_token);
        let response = server.get("/api/users/").add_header(name, value).await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        let results = body["data"]["results"].as_array().unwrap();
        let author = results
            .iter()
            .find(|u| u["id"].as_i64().unwrap() == author_id)
            .unwrap();
        assert_eq!(author["is_subscribed"], true);
        let reader = results
            .iter()
            .find(|u| u["username"] == "reader")
            .unwrap();
        assert_eq!(reader["is_subscribed"], false);
    }
}
