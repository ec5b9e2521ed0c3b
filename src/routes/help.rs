//! `GET /api/help` — self-describing API documentation.

use axum::Json;
use serde_json::{json, Value};

pub async fn help() -> Json<Value> {
    Json(json!({
        "name": "sigorest",
        "description": "OpenAI-compatible REST gateway for heterogeneous LLM providers",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            {
                "path": "/v1/chat/completions",
                "method": "POST",
                "description": "OpenAI-compatible chat completion API",
                "parameters": {
                    "model": "Model id or shortcode (e.g. 'claude-h', 'gpt41')",
                    "messages": "Array of {role, content} objects",
                    "temperature": "Optional: sampling temperature (default: model midpoint)",
                    "max_tokens": "Optional: output token ceiling",
                    "session_id": "Optional: session id for conversation history",
                    "timeout": "Optional: timeout in seconds (default: 180)",
                    "retries": "Optional: retry budget (default: 3)"
                },
                "example": "curl -s http://localhost:9080/v1/chat/completions -H 'Content-Type: application/json' -d '{\"model\":\"claude-h\",\"messages\":[{\"role\":\"user\",\"content\":\"Hello\"}]}'"
            },
            {
                "path": "/v1/models",
                "method": "GET",
                "description": "List of available models (OpenAI-compatible)",
                "example": "curl -s http://localhost:9080/v1/models"
            },
            {
                "path": "/api/models",
                "method": "GET",
                "description": "Detailed model records (costs, limits)",
                "example": "curl -s http://localhost:9080/api/models"
            },
            {
                "path": "/api/health",
                "method": "GET",
                "description": "Server status and circuit-breaker state",
                "example": "curl -s http://localhost:9080/api/health | jq"
            },
            {
                "path": "/api/memory",
                "method": "GET/PUT",
                "description": "Read or replace the shared memory block",
                "parameters": {
                    "content": "System preamble prepended to every request",
                    "cache": "Boolean: flag the preamble for upstream prompt caching"
                },
                "example": "curl -s -X PUT http://localhost:9080/api/memory -H 'Content-Type: application/json' -d '{\"content\":\"Respond in German.\",\"cache\":true}'"
            },
            {
                "path": "/api/help",
                "method": "GET",
                "description": "This document",
                "example": "curl -s http://localhost:9080/api/help"
            }
        ],
        "features": {
            "circuit_breaker": "Per-model failure isolation: opens after 5 retryable failures in 60s",
            "retry": "Exponential backoff: 500ms, 1s, 2s, capped at 5s; honours Retry-After",
            "session_management": "JSON sessions in .sessions/, capped at 20 turns",
            "ip_access_control": "HTTP: localhost only, HTTPS: private networks",
            "ollama_discovery": "Auto-discovery of local Ollama models at startup",
            "memory_block": "Shared system preamble for every request"
        },
        "error_types": {
            "rate_limit": "HTTP 429 - too many requests, Retry-After header set",
            "auth_failed": "HTTP 401 - invalid upstream API key",
            "timeout": "HTTP 504 - request timeout",
            "server_error": "HTTP 503 - upstream server failure",
            "client_error": "HTTP 400 - invalid request",
            "circuit_open": "HTTP 503 - circuit breaker open",
            "api_error": "HTTP 502 - unclassified upstream failure"
        },
        "environment_variables": {
            "MAMMOUTH_API_KEY": "GPT, Gemini, Mistral, DeepSeek, relayed Claude models",
            "ANTHROPIC_API_KEY": "Direct Claude models",
            "MOONSHOT_API_KEY": "Kimi / Moonshot models",
            "ZAI_API_KEY": "GLM models"
        }
    }))
}
