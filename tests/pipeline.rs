//! Indexing, search and planning against mocked embedding/chat endpoints
//! and a local SQLite vector collection.

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use codeplan::chat::AzureChatClient;
use codeplan::config::{ChatConfig, EmbeddingConfig, IndexConfig, PlanConfig};
use codeplan::embedding::AzureEmbedder;
use codeplan::index::index_code_base;
use codeplan::plan::generate_task_plan;
use codeplan::search::search_code_base;
use codeplan::vector_store::{SqliteVectorStore, VectorStore};
use codeplan::{db, migrate};

const KEY: &str = "test-key";

fn embedding_config(server: &ServerGuard) -> EmbeddingConfig {
    EmbeddingConfig {
        url: format!("{}/embeddings", server.url()),
        api_key_env: "UNUSED".to_string(),
        timeout_secs: 5,
        max_retries: 0,
    }
}

fn chat_config(server: &ServerGuard) -> ChatConfig {
    ChatConfig {
        url: format!("{}/chat", server.url()),
        api_key_env: "UNUSED".to_string(),
        timeout_secs: 5,
        max_retries: 0,
    }
}

fn embedding_body(vector: &[f32]) -> String {
    json!({"data": [{"index": 0, "embedding": vector}]}).to_string()
}

async fn mock_embedding(server: &mut ServerGuard, input: &str, vector: &[f32]) -> mockito::Mock {
    server
        .mock("POST", "/embeddings")
        .match_header("api-key", KEY)
        .match_body(Matcher::PartialJson(
            json!({"input": input, "encoding_format": "float"}),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(embedding_body(vector))
        .expect(1)
        .create_async()
        .await
}

async fn open_store(tmp: &TempDir) -> SqliteVectorStore {
    let pool = db::connect_path(&tmp.path().join("data/codeplan.sqlite"))
        .await
        .unwrap();
    migrate::apply_schema(&pool).await.unwrap();
    let store = SqliteVectorStore::new(pool, "CodeFile");
    store.ensure_collection().await.unwrap();
    store
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn test_index_skips_blank_files_without_embedding_call() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("project");
    write(&root, "interview/models.py", "class Interview: pass");
    write(&root, "interview/__init__.py", "   \n\t\n");

    let mut server = Server::new_async().await;
    let models = mock_embedding(&mut server, "class Interview: pass", &[1.0, 0.0]).await;
    // Anything else reaching the endpoint is a bug
    let blank = server
        .mock("POST", "/embeddings")
        .match_body(Matcher::PartialJson(json!({"input": "   \n\t\n"})))
        .expect(0)
        .create_async()
        .await;

    let embedder = AzureEmbedder::new(&embedding_config(&server), KEY.to_string()).unwrap();
    let store = open_store(&tmp).await;
    let cfg = IndexConfig {
        root: root.clone(),
        ..IndexConfig::default()
    };

    let report = index_code_base(&cfg, &embedder, &store).await.unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(store.count().await.unwrap(), 1);
    models.assert_async().await;
    blank.assert_async().await;
}

#[tokio::test]
async fn test_index_continues_after_embedding_failure() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("project");
    write(&root, "a.py", "a = 1");
    write(&root, "b.py", "b = 2");
    write(&root, "c.py", "c = 3");

    let mut server = Server::new_async().await;
    let a = mock_embedding(&mut server, "a = 1", &[1.0, 0.0]).await;
    let b = server
        .mock("POST", "/embeddings")
        .match_body(Matcher::PartialJson(json!({"input": "b = 2"})))
        .with_status(500)
        .with_body("upstream exploded")
        .expect(1)
        .create_async()
        .await;
    let c = mock_embedding(&mut server, "c = 3", &[0.0, 1.0]).await;

    let embedder = AzureEmbedder::new(&embedding_config(&server), KEY.to_string()).unwrap();
    let store = open_store(&tmp).await;
    let cfg = IndexConfig {
        root,
        ..IndexConfig::default()
    };

    let report = index_code_base(&cfg, &embedder, &store).await.unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 1);
    a.assert_async().await;
    b.assert_async().await;
    c.assert_async().await;

    let hits = store.near_vector(&[1.0, 1.0], 5).await.unwrap();
    let mut paths: Vec<&str> = hits.iter().map(|m| m.file_path.as_str()).collect();
    paths.sort();
    assert_eq!(paths, vec!["a.py", "c.py"]);
}

#[tokio::test]
async fn test_reindex_does_not_duplicate() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("project");
    write(&root, "a.py", "a = 1");

    let mut server = Server::new_async().await;
    let a = server
        .mock("POST", "/embeddings")
        .match_body(Matcher::PartialJson(json!({"input": "a = 1"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(embedding_body(&[1.0, 0.0]))
        .expect(2)
        .create_async()
        .await;

    let embedder = AzureEmbedder::new(&embedding_config(&server), KEY.to_string()).unwrap();
    let store = open_store(&tmp).await;
    let cfg = IndexConfig {
        root,
        ..IndexConfig::default()
    };

    index_code_base(&cfg, &embedder, &store).await.unwrap();
    index_code_base(&cfg, &embedder, &store).await.unwrap();

    assert_eq!(store.count().await.unwrap(), 1);
    a.assert_async().await;
}

#[tokio::test]
async fn test_search_with_fewer_documents_than_limit() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    for (path, vec) in [
        ("a.py", [1.0f32, 0.0]),
        ("b.py", [0.0, 1.0]),
        ("c.py", [0.6, 0.8]),
    ] {
        store
            .upsert(
                &codeplan::models::CodeFile {
                    file_path: path.to_string(),
                    content: format!("# {}", path),
                },
                &vec,
            )
            .await
            .unwrap();
    }

    let mut server = Server::new_async().await;
    let q = mock_embedding(&mut server, "where are models", &[0.0, 1.0]).await;
    let embedder = AzureEmbedder::new(&embedding_config(&server), KEY.to_string()).unwrap();

    let hits = search_code_base(&embedder, &store, "where are models", 5)
        .await
        .unwrap();

    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].file_path, "b.py");
    q.assert_async().await;
}

#[tokio::test]
async fn test_search_aborts_when_query_embedding_fails() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let mut server = Server::new_async().await;
    let m = server
        .mock("POST", "/embeddings")
        .with_status(401)
        .with_body("bad key")
        .expect(1)
        .create_async()
        .await;
    let embedder = AzureEmbedder::new(&embedding_config(&server), KEY.to_string()).unwrap();

    let err = search_code_base(&embedder, &store, "q", 5).await.unwrap_err();
    assert!(format!("{:#}", err).contains("401"));
    m.assert_async().await;
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("POST", "/embeddings")
        .with_status(400)
        .with_body("input too long")
        .expect(1)
        .create_async()
        .await;

    let mut cfg = embedding_config(&server);
    cfg.max_retries = 3;
    let embedder = AzureEmbedder::new(&cfg, KEY.to_string()).unwrap();

    use codeplan::embedding::Embedder;
    let err = embedder.embed("x").await.unwrap_err();
    assert!(err.to_string().contains("input too long"));
    m.assert_async().await;
}

#[tokio::test]
async fn test_server_error_is_retried_until_success() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("POST", "/embeddings")
        .with_status(500)
        .with_body("upstream busy")
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("POST", "/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(embedding_body(&[0.25, 0.75]))
        .expect(1)
        .create_async()
        .await;

    let mut cfg = embedding_config(&server);
    cfg.max_retries = 1;
    let embedder = AzureEmbedder::new(&cfg, KEY.to_string()).unwrap();

    use codeplan::embedding::Embedder;
    let vector = embedder.embed("x").await.unwrap();
    assert_eq!(vector, vec![0.25, 0.75]);
    failing.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_exhausting_retries_returns_last_error() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("POST", "/embeddings")
        .with_status(429)
        .with_body("slow down")
        .expect(2)
        .create_async()
        .await;

    let mut cfg = embedding_config(&server);
    cfg.max_retries = 1;
    let embedder = AzureEmbedder::new(&cfg, KEY.to_string()).unwrap();

    use codeplan::embedding::Embedder;
    let err = embedder.embed("x").await.unwrap_err();
    let msg = format!("{:#}", err);
    assert!(msg.contains("429"));
    assert!(msg.contains("slow down"));
    m.assert_async().await;
}

#[tokio::test]
async fn test_generate_task_plan_writes_artifact() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    store
        .upsert(
            &codeplan::models::CodeFile {
                file_path: "interview/models.py".to_string(),
                content: "class InterviewAttempt: pass".to_string(),
            },
            &[1.0, 0.0],
        )
        .await
        .unwrap();

    let query = "Add a feedback score to interview attempts";
    let plan_text = "1. Add `score` to InterviewAttempt\n2. Write a migration";

    let mut server = Server::new_async().await;
    let emb = mock_embedding(&mut server, query, &[1.0, 0.1]).await;
    let chat = server
        .mock("POST", "/chat")
        .match_header("api-key", KEY)
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({
                "temperature": 0.0,
                "top_p": 1.0,
                "frequency_penalty": 0.0,
                "presence_penalty": 0.5
            })),
            Matcher::Regex("Add a feedback score to interview attempts".to_string()),
            Matcher::Regex("File: interview/models.py".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"choices": [{"message": {"role": "assistant", "content": plan_text}}]})
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let embedder = AzureEmbedder::new(&embedding_config(&server), KEY.to_string()).unwrap();
    let chat_client = AzureChatClient::new(&chat_config(&server), KEY.to_string()).unwrap();
    let plan_cfg = PlanConfig {
        queries_dir: tmp.path().join("queries"),
        ..PlanConfig::default()
    };

    let result = generate_task_plan(&embedder, &store, &chat_client, &plan_cfg, query, 5)
        .await
        .unwrap();

    assert_eq!(result.plan, plan_text);
    assert!(result.code_context.contains("class InterviewAttempt: pass"));
    assert!(result.saved_to.starts_with(tmp.path().join("queries")));

    let saved = fs::read_to_string(&result.saved_to).unwrap();
    assert!(saved.contains(query));
    assert!(saved.contains(plan_text));
    assert!(saved.contains("File: interview/models.py"));

    emb.assert_async().await;
    chat.assert_async().await;
}

#[tokio::test]
async fn test_plan_not_saved_when_chat_fails() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let mut server = Server::new_async().await;
    let _emb = mock_embedding(&mut server, "task", &[1.0, 0.0]).await;
    let _chat = server
        .mock("POST", "/chat")
        .with_status(500)
        .with_body("overloaded")
        .create_async()
        .await;

    let embedder = AzureEmbedder::new(&embedding_config(&server), KEY.to_string()).unwrap();
    let chat_client = AzureChatClient::new(&chat_config(&server), KEY.to_string()).unwrap();
    let queries_dir = tmp.path().join("queries");
    let plan_cfg = PlanConfig {
        queries_dir: queries_dir.clone(),
        ..PlanConfig::default()
    };

    let result = generate_task_plan(&embedder, &store, &chat_client, &plan_cfg, "task", 5).await;

    assert!(result.is_err());
    assert!(!queries_dir.exists());
}
