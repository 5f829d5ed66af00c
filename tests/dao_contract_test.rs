// ABOUTME: DAO contract suite run against both the volatile and the durable backend
// ABOUTME: Covers creation, filters, sorting, paging, projections, updates, upserts and aggregates
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{all_backends, at, create_user};
use cragbook_server::{
    database_plugins::{
        Dao, Database, FieldValue, Filter, FindOptions, Projection, Sort, SortDirection, Update,
    },
    errors::ErrorCode,
    models::{Attempt, AttemptOutcome, Entity, Follow, Location, Privacy, RouteRating, User},
    pagination::Page,
};
use uuid::Uuid;

/// Ratings of one route with scores `scores[i]` created at `at(i)`
async fn seed_ratings(database: &Database, route: Uuid, scores: &[u8]) -> Vec<RouteRating> {
    let mut created = Vec::new();
    for (i, score) in scores.iter().enumerate() {
        let mut rating = RouteRating::new(Uuid::new_v4(), route, *score);
        rating.created_at = at(i as i64);
        created.push(database.ratings().create(rating).await.unwrap());
    }
    created
}

fn ids<T: Entity>(items: &[T]) -> Vec<Uuid> {
    items.iter().map(Entity::id).collect()
}

#[tokio::test]
async fn test_create_assigns_id_and_round_trips() {
    for (backend, database) in all_backends().await.unwrap() {
        let user = create_user(&database, "ada", Privacy::Public).await.unwrap();
        assert!(!user.id.is_nil(), "{backend}");

        let by_id = database.users().find_by_id(user.id).await.unwrap();
        assert_eq!(by_id.as_ref(), Some(&user), "{backend}");

        let by_name = database
            .users()
            .find_one(&Filter::eq("username", "ada"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name, user, "{backend}");
        assert_eq!(by_name.email, "ada@example.com", "{backend}");
    }
}

#[tokio::test]
async fn test_create_keeps_given_id_and_rejects_duplicates() {
    for (backend, database) in all_backends().await.unwrap() {
        let id = Uuid::new_v4();
        let mut location = Location::new("Frankenjura", Uuid::new_v4());
        location.id = id;
        let stored = database.locations().create(location.clone()).await.unwrap();
        assert_eq!(stored.id, id, "{backend}");

        let err = database.locations().create(location).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ResourceAlreadyExists, "{backend}");
    }
}

#[tokio::test]
async fn test_absence_is_a_value() {
    for (backend, database) in all_backends().await.unwrap() {
        let users = database.users();
        assert!(users.find_by_id(Uuid::new_v4()).await.unwrap().is_none(), "{backend}");
        assert!(users
            .find_one(&Filter::eq("username", "nobody"))
            .await
            .unwrap()
            .is_none());
        assert!(users
            .find(&Filter::All, &FindOptions::default())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(users.count(&Filter::All).await.unwrap(), 0, "{backend}");
        assert_eq!(users.delete(&Filter::All).await.unwrap(), 0, "{backend}");
        assert!(!users.delete_by_id(Uuid::new_v4()).await.unwrap(), "{backend}");
        assert_eq!(
            database.ratings().average(&Filter::All, "rating").await.unwrap(),
            None,
            "{backend}"
        );
    }
}

#[tokio::test]
async fn test_unsorted_find_uses_insertion_order() {
    for (backend, database) in all_backends().await.unwrap() {
        let route = Uuid::new_v4();
        let mut seeded = Vec::new();
        for (i, score) in [3_u8, 1, 2].iter().enumerate() {
            let mut rating = RouteRating::new(Uuid::new_v4(), route, *score);
            // Newest first, so insertion order differs from timestamp order
            rating.created_at = at(100 - i as i64);
            seeded.push(database.ratings().create(rating).await.unwrap());
        }
        let found = database
            .ratings()
            .find(&Filter::All, &FindOptions::unbounded())
            .await
            .unwrap();
        assert_eq!(ids(&found), ids(&seeded), "{backend}");

        let first = database.ratings().find_one(&Filter::All).await.unwrap().unwrap();
        assert_eq!(first.id, seeded[0].id, "{backend}");
    }
}

#[tokio::test]
async fn test_sort_offset_limit() {
    for (backend, database) in all_backends().await.unwrap() {
        let route = Uuid::new_v4();
        let seeded = seed_ratings(&database, route, &[5, 3, 4, 1, 2, 5, 3]).await;

        let by_time = Sort::ascending("created_at");
        let page = database
            .ratings()
            .find(&Filter::All, &FindOptions::unbounded().sorted(by_time).skip(2).take(3))
            .await
            .unwrap();
        assert_eq!(ids(&page), ids(&seeded[2..5]), "{backend}");

        let newest = database
            .ratings()
            .find(
                &Filter::All,
                &FindOptions::default().sorted(Sort::descending("created_at")).take(2),
            )
            .await
            .unwrap();
        assert_eq!(ids(&newest), vec![seeded[6].id, seeded[5].id], "{backend}");
    }
}

#[tokio::test]
async fn test_default_find_limit_is_twenty() {
    for (backend, database) in all_backends().await.unwrap() {
        seed_ratings(&database, Uuid::new_v4(), &[1; 25]).await;
        let found = database
            .ratings()
            .find(&Filter::All, &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(found.len(), 20, "{backend}");
    }
}

#[tokio::test]
async fn test_sort_ties_break_by_id() {
    for (backend, database) in all_backends().await.unwrap() {
        let route = Uuid::new_v4();
        let mut seeded = Vec::new();
        for _ in 0..6 {
            let mut rating = RouteRating::new(Uuid::new_v4(), route, 4);
            rating.created_at = at(0);
            seeded.push(database.ratings().create(rating).await.unwrap());
        }
        let mut expected = ids(&seeded);
        expected.sort_by_key(ToString::to_string);

        for sort in [
            Sort::ascending("rating"),
            Sort::descending("rating").then("created_at", SortDirection::Descending),
        ] {
            let found = database
                .ratings()
                .find(&Filter::All, &FindOptions::unbounded().sorted(sort))
                .await
                .unwrap();
            assert_eq!(ids(&found), expected, "{backend}");
        }
    }
}

#[tokio::test]
async fn test_consecutive_pages_are_disjoint_and_contiguous() {
    for (backend, database) in all_backends().await.unwrap() {
        let route = Uuid::new_v4();
        let scores: Vec<u8> = (0..25).map(|i| (i % 5 + 1) as u8).collect();
        let seeded = seed_ratings(&database, route, &scores).await;
        let sort = Sort::ascending("created_at");
        let filter = Filter::eq("route", route);

        let first = database
            .ratings()
            .find(&filter, &FindOptions::page(sort.clone(), Page::sanitize(Some(0), Some(10))))
            .await
            .unwrap();
        let second = database
            .ratings()
            .find(&filter, &FindOptions::page(sort, Page::sanitize(Some(10), Some(10))))
            .await
            .unwrap();

        assert_eq!(first.len(), 10, "{backend}");
        assert_eq!(second.len(), 10, "{backend}");
        let mut union = ids(&first);
        union.extend(ids(&second));
        assert_eq!(union, ids(&seeded[..20]), "{backend}");
    }
}

#[tokio::test]
async fn test_filter_operators() {
    for (backend, database) in all_backends().await.unwrap() {
        let route = Uuid::new_v4();
        let other_route = Uuid::new_v4();
        seed_ratings(&database, route, &[1, 2, 3, 4, 5]).await;
        seed_ratings(&database, other_route, &[5]).await;
        let ratings = database.ratings();

        let count = |filter: Filter| {
            let ratings = ratings.clone();
            async move { ratings.count(&filter).await.unwrap() }
        };

        assert_eq!(count(Filter::eq("rating", 5_u8)).await, 2, "{backend}");
        assert_eq!(count(Filter::eq("rating", 5.0)).await, 2, "{backend}");
        assert_eq!(count(Filter::ne("rating", 5_u8)).await, 4, "{backend}");
        assert_eq!(count(Filter::is_in("rating", [1_u8, 3, 9])).await, 2, "{backend}");
        assert_eq!(
            count(Filter::is_in("rating", Vec::<FieldValue>::new())).await,
            0,
            "{backend}"
        );
        assert_eq!(count(Filter::gt("rating", 3_u8)).await, 3, "{backend}");
        assert_eq!(count(Filter::gte("rating", 3_u8)).await, 4, "{backend}");
        assert_eq!(count(Filter::lt("rating", 3_u8)).await, 2, "{backend}");
        assert_eq!(count(Filter::lte("rating", 2.5)).await, 2, "{backend}");
        assert_eq!(
            count(Filter::eq("route", route).and(Filter::gte("rating", 4_u8))).await,
            2,
            "{backend}"
        );
        assert_eq!(
            count(Filter::gte("created_at", at(2)).and(Filter::lt("created_at", at(4)))).await,
            2,
            "{backend}"
        );
    }
}

#[tokio::test]
async fn test_comparisons_only_match_same_class() {
    for (backend, database) in all_backends().await.unwrap() {
        seed_ratings(&database, Uuid::new_v4(), &[1, 2, 3]).await;
        let ratings = database.ratings();
        assert_eq!(ratings.count(&Filter::gt("rating", "0")).await.unwrap(), 0, "{backend}");
        assert_eq!(ratings.count(&Filter::lt("route", 10_i64)).await.unwrap(), 0, "{backend}");
        assert_eq!(
            ratings.count(&Filter::gte("rating", FieldValue::Null)).await.unwrap(),
            0,
            "{backend}"
        );
    }
}

#[tokio::test]
async fn test_missing_fields_and_booleans() {
    for (backend, database) in all_backends().await.unwrap() {
        let owner = Uuid::new_v4();
        let mut described = Location::new("Ceuse", owner);
        described.description = Some("Limestone".into());
        database.locations().create(described).await.unwrap();
        database.locations().create(Location::new("Bleau", owner)).await.unwrap();

        let locations = database.locations();
        let undescribed = locations
            .find(&Filter::eq("description", FieldValue::Null), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(undescribed.len(), 1, "{backend}");
        assert_eq!(undescribed[0].name, "Bleau", "{backend}");
        assert_eq!(
            locations.count(&Filter::ne("description", FieldValue::Null)).await.unwrap(),
            1,
            "{backend}"
        );

        let mut admin = User::new("root", "root@example.com", "hash");
        admin.is_admin = true;
        database.users().create(admin).await.unwrap();
        create_user(&database, "ada", Privacy::Private).await.unwrap();
        let users = database.users();
        assert_eq!(users.count(&Filter::eq("is_admin", true)).await.unwrap(), 1, "{backend}");
        assert_eq!(users.count(&Filter::eq("is_admin", 0_i64)).await.unwrap(), 1, "{backend}");
        assert_eq!(
            users
                .count(&Filter::eq("privacy.attempts", Privacy::Private))
                .await
                .unwrap(),
            1,
            "{backend}"
        );
    }
}

#[tokio::test]
async fn test_invalid_field_names_rejected() {
    for (backend, database) in all_backends().await.unwrap() {
        let err = database
            .users()
            .count(&Filter::eq("name') OR 1=1 --", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput, "{backend}");

        let err = database
            .users()
            .find(&Filter::All, &FindOptions::default().sorted(Sort::ascending("a b")))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput, "{backend}");
    }
}

#[tokio::test]
async fn test_non_finite_operands_rejected() {
    for (backend, database) in all_backends().await.unwrap() {
        create_user(&database, "ada", Privacy::Public).await.unwrap();
        let users = database.users();

        let err = users.count(&Filter::eq("is_admin", f64::NAN)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput, "{backend}");

        let err = users
            .find(&Filter::gte("created_at", f64::NAN), &FindOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput, "{backend}");

        let err = users
            .update_many(&Filter::All, &Update::new().set("score", f64::INFINITY), false)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput, "{backend}");
        assert_eq!(users.count(&Filter::All).await.unwrap(), 1, "{backend}");
    }
}

#[tokio::test]
async fn test_negation_matches_missing_fields() {
    for (backend, database) in all_backends().await.unwrap() {
        let owner = Uuid::new_v4();
        let mut described = Location::new("Ceuse", owner);
        described.description = Some("Limestone".into());
        database.locations().create(described).await.unwrap();
        database.locations().create(Location::new("Bleau", owner)).await.unwrap();

        let locations = database.locations();
        let others = locations
            .find(&Filter::ne("description", "Limestone"), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(others.len(), 1, "{backend}");
        assert_eq!(others[0].name, "Bleau", "{backend}");
        assert_eq!(
            locations
                .count(&Filter::is_in("description", vec!["Limestone", "Granite"]))
                .await
                .unwrap(),
            1,
            "{backend}"
        );
    }
}

#[tokio::test]
async fn test_projection_keeps_id_and_named_fields() {
    for (backend, database) in all_backends().await.unwrap() {
        let user = create_user(&database, "ada", Privacy::Public).await.unwrap();
        let projected = database
            .users()
            .find_one_projected(&Filter::by_id(user.id), &Projection::new(["username"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(projected.len(), 2, "{backend}");
        assert_eq!(projected["username"], "ada", "{backend}");
        assert_eq!(projected["id"], user.id.to_string(), "{backend}");

        let all = database
            .users()
            .find_projected(&Filter::All, &Projection::new(["email"]), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1, "{backend}");
        assert!(!all[0].contains_key("password_hash"), "{backend}");
    }
}

#[tokio::test]
async fn test_delete_by_filter_and_id() {
    for (backend, database) in all_backends().await.unwrap() {
        let route = Uuid::new_v4();
        let seeded = seed_ratings(&database, route, &[1, 2, 3, 4]).await;
        let ratings = database.ratings();

        assert_eq!(ratings.delete(&Filter::lt("rating", 3_u8)).await.unwrap(), 2, "{backend}");
        assert!(ratings.delete_by_id(seeded[3].id).await.unwrap(), "{backend}");
        assert!(ratings.find_by_id(seeded[3].id).await.unwrap().is_none(), "{backend}");
        assert!(!ratings.delete_by_id(seeded[3].id).await.unwrap(), "{backend}");
        assert_eq!(ratings.count(&Filter::All).await.unwrap(), 1, "{backend}");
    }
}

#[tokio::test]
async fn test_update_one_reports_modification() {
    for (backend, database) in all_backends().await.unwrap() {
        let user = create_user(&database, "ada", Privacy::Public).await.unwrap();
        let users = database.users();
        let filter = Filter::by_id(user.id);
        let promote = Update::new().set("is_admin", true);

        assert!(users.update_one(&filter, &promote, true).await.unwrap(), "{backend}");
        assert!(!users.update_one(&filter, &promote, true).await.unwrap(), "{backend}");
        assert!(users.find_by_id(user.id).await.unwrap().unwrap().is_admin, "{backend}");

        let hide = Update::new().set("privacy.sessions", Privacy::Private);
        assert!(users.update_one(&filter, &hide, false).await.unwrap(), "{backend}");
        let stored = users.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.privacy.sessions, Privacy::Private, "{backend}");
        assert_eq!(stored.privacy.attempts, Privacy::Public, "{backend}");

        assert!(!users
            .update_one(&Filter::by_id(Uuid::new_v4()), &promote, false)
            .await
            .unwrap());
        assert_eq!(users.count(&Filter::All).await.unwrap(), 1, "{backend}");
    }
}

#[tokio::test]
async fn test_update_many_and_increment() {
    for (backend, database) in all_backends().await.unwrap() {
        let route = Uuid::new_v4();
        seed_ratings(&database, route, &[1, 2, 3]).await;
        let ratings = database.ratings();

        let modified = ratings
            .update_many(&Filter::lte("rating", 2_u8), &Update::new().inc("rating", 2_i64), false)
            .await
            .unwrap();
        assert_eq!(modified, 2, "{backend}");
        assert_eq!(ratings.count(&Filter::gte("rating", 3_u8)).await.unwrap(), 3, "{backend}");
        assert_eq!(
            ratings.average(&Filter::All, "rating").await.unwrap(),
            Some(10.0 / 3.0),
            "{backend}"
        );
    }
}

#[tokio::test]
async fn test_upsert_inserts_from_equalities() {
    for (backend, database) in all_backends().await.unwrap() {
        let (follower, followee) = (Uuid::new_v4(), Uuid::new_v4());
        let filter = Filter::eq("follower", follower).and(Filter::eq("followee", followee));
        let update = Update::new().set("created_at", at(0));
        let follows = database.follows();

        assert!(follows.update_one(&filter, &update, true).await.unwrap(), "{backend}");
        let stored: Follow = follows.find_one(&filter).await.unwrap().unwrap();
        assert_eq!(stored.follower, follower, "{backend}");
        assert_eq!(stored.created_at, at(0), "{backend}");
        assert!(!stored.id.is_nil(), "{backend}");

        // Matching now, and unchanged
        assert!(!follows.update_one(&filter, &update, true).await.unwrap(), "{backend}");
        assert_eq!(follows.count(&Filter::All).await.unwrap(), 1, "{backend}");
    }
}

#[tokio::test]
async fn test_invalid_updates_rejected() {
    for (backend, database) in all_backends().await.unwrap() {
        let user = create_user(&database, "ada", Privacy::Public).await.unwrap();
        let users = database.users();

        let err = users
            .update_one(&Filter::by_id(user.id), &Update::new().set("id", Uuid::new_v4()), false)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput, "{backend}");

        // Would leave a document that is not a valid user
        let err = users
            .update_one(&Filter::by_id(user.id), &Update::new().unset("username"), false)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput, "{backend}");
        assert_eq!(users.find_by_id(user.id).await.unwrap().unwrap(), user, "{backend}");
    }
}

#[tokio::test]
async fn test_average_ignores_non_matching_and_missing() {
    for (backend, database) in all_backends().await.unwrap() {
        let route = Uuid::new_v4();
        seed_ratings(&database, route, &[2, 4]).await;
        seed_ratings(&database, Uuid::new_v4(), &[5]).await;
        let ratings = database.ratings();
        assert_eq!(
            ratings.average(&Filter::eq("route", route), "rating").await.unwrap(),
            Some(3.0),
            "{backend}"
        );
        assert_eq!(
            ratings.average(&Filter::All, "no_such_field").await.unwrap(),
            None,
            "{backend}"
        );
    }
}

#[tokio::test]
async fn test_clear_empties_collection() {
    for (backend, database) in all_backends().await.unwrap() {
        let user = create_user(&database, "ada", Privacy::Public).await.unwrap();
        database
            .attempts()
            .create(Attempt::new(user.id, Uuid::new_v4(), AttemptOutcome::Flash))
            .await
            .unwrap();
        database.attempts().clear().await.unwrap();
        assert_eq!(database.attempts().count(&Filter::All).await.unwrap(), 0, "{backend}");
        assert_eq!(database.users().count(&Filter::All).await.unwrap(), 1, "{backend}");

        database.clear_all().await.unwrap();
        assert_eq!(database.users().count(&Filter::All).await.unwrap(), 0, "{backend}");
    }
}
