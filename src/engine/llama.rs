// Copyright 2025 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// llama.cpp-backed engine

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::sampling::LlamaSampler;

use super::{
	find_stop, Completion, CompletionRequest, GenerationOptions, ModelEngine, ModelOptions,
	TokenUsage,
};

/// Local inference engine over the native llama.cpp library.
///
/// The backend and model weights are loaded once and shared; every request
/// evaluates the full rendered prompt in a fresh inference context, so the
/// engine itself carries no conversation state between turns.
pub struct LlamaEngine {
	backend: Arc<LlamaBackend>,
	model: Arc<LlamaModel>,
	options: ModelOptions,
}

impl LlamaEngine {
	/// Load the model described by `options`. Construction options are
	/// passed through to the native library unchanged.
	pub fn load(options: ModelOptions) -> Result<Self> {
		if !options.path.is_file() {
			anyhow::bail!(
				"model file not found: {} (set model.path in the config or OCTOLLAMA_MODEL)",
				options.path.display()
			);
		}

		let mut backend =
			LlamaBackend::init().context("failed to initialize the llama.cpp backend")?;
		if !options.verbose {
			backend.void_logs();
		}

		let model_params = if options.gpu_layers > 0 {
			LlamaModelParams::default().with_n_gpu_layers(options.gpu_layers)
		} else {
			LlamaModelParams::default()
		};

		let model = LlamaModel::load_from_file(&backend, &options.path, &model_params)
			.with_context(|| format!("unable to load model from {}", options.path.display()))?;

		Ok(Self {
			backend: Arc::new(backend),
			model: Arc::new(model),
			options,
		})
	}
}

#[async_trait::async_trait]
impl ModelEngine for LlamaEngine {
	fn name(&self) -> &str {
		"llama.cpp"
	}

	fn describe(&self) -> String {
		describe_options(&self.options)
	}

	async fn complete(
		&self,
		request: CompletionRequest,
		cancel: Arc<AtomicBool>,
	) -> Result<Completion> {
		let backend = self.backend.clone();
		let model = self.model.clone();
		let options = self.options.clone();
		// Inference is CPU/GPU-bound and can run for a long time, so it
		// goes on the blocking pool; the session loop awaits exactly one
		// request at a time.
		tokio::task::spawn_blocking(move || generate(&backend, &model, &options, request, &cancel))
			.await
			.context("generation worker failed")?
	}
}

fn describe_options(options: &ModelOptions) -> String {
	let model_name = options
		.path
		.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_else(|| options.path.display().to_string());
	format!(
		"{} (context {}, template {}, gpu layers {})",
		model_name,
		options.context_size,
		options.template.as_str(),
		options.gpu_layers
	)
}

/// Run one full prompt evaluation + sampling loop. Polls `cancel` between
/// steps and returns whatever was generated so far once it is set.
fn generate(
	backend: &LlamaBackend,
	model: &LlamaModel,
	options: &ModelOptions,
	request: CompletionRequest,
	cancel: &AtomicBool,
) -> Result<Completion> {
	let started = Instant::now();

	let prompt = options
		.template
		.render(request.system_prompt.as_deref(), &request.messages);

	let tokens = model
		.str_to_token(&prompt, AddBos::Always)
		.with_context(|| format!("failed to tokenize prompt ({} chars)", prompt.len()))?;
	if tokens.is_empty() {
		anyhow::bail!("rendered prompt produced no tokens");
	}

	let mut ctx_params = LlamaContextParams::default()
		.with_n_ctx(NonZeroU32::new(options.context_size))
		.with_n_batch(options.batch_size.max(1));
	if let Some(threads) = options.threads {
		ctx_params = ctx_params
			.with_n_threads(threads)
			.with_n_threads_batch(threads);
	}

	let mut ctx = model
		.new_context(backend, ctx_params)
		.context("unable to create the inference context")?;

	let n_ctx = ctx.n_ctx() as usize;
	if tokens.len() + 1 > n_ctx {
		anyhow::bail!(
			"prompt needs {} tokens but the context window holds {}; shorten the input or raise model.context_size",
			tokens.len(),
			n_ctx
		);
	}

	let usage_for = |output_tokens: u64| TokenUsage {
		prompt_tokens: tokens.len() as u64,
		output_tokens,
		total_tokens: tokens.len() as u64 + output_tokens,
		generation_time_ms: Some(started.elapsed().as_millis() as u64),
	};

	// Feed the prompt in batch-sized chunks; only the final prompt token
	// needs logits.
	let batch_size = options.batch_size.max(1) as usize;
	let mut batch = LlamaBatch::new(batch_size, 1);
	let last_prompt_index = tokens.len() as i32 - 1;
	let mut pos: i32 = 0;
	for chunk in tokens.chunks(batch_size) {
		if cancel.load(Ordering::SeqCst) {
			return Ok(Completion {
				content: String::new(),
				usage: usage_for(0),
			});
		}
		batch.clear();
		for &token in chunk {
			batch.add(token, pos, &[0], pos == last_prompt_index)?;
			pos += 1;
		}
		ctx.decode(&mut batch).context("prompt evaluation failed")?;
	}

	let stop_patterns: Vec<&str> = options
		.template
		.stop_patterns()
		.iter()
		.copied()
		.chain(request.options.stop.iter().map(|s| s.as_str()))
		.collect();

	let mut sampler = build_sampler(&request.options);
	let mut decoder = encoding_rs::UTF_8.new_decoder();
	let mut content = String::new();
	let mut n_generated: u64 = 0;
	let mut n_cur = tokens.len() as i32;

	while n_generated < u64::from(request.options.max_tokens) && (n_cur as usize) < n_ctx {
		if cancel.load(Ordering::SeqCst) {
			break;
		}

		let token = sampler.sample(&ctx, batch.n_tokens() - 1);
		sampler.accept(token);

		if model.is_eog_token(token) {
			break;
		}

		let piece_bytes = model
			.token_to_bytes(token, Special::Tokenize)
			.context("failed to decode a generated token")?;
		// Token pieces are not always valid UTF-8 on their own; the
		// decoder carries partial sequences across iterations.
		let mut piece = String::with_capacity(32);
		let _ = decoder.decode_to_string(&piece_bytes, &mut piece, false);
		content.push_str(&piece);
		n_generated += 1;

		if let Some(idx) = find_stop(&content, &stop_patterns) {
			content.truncate(idx);
			break;
		}

		batch.clear();
		batch.add(token, n_cur, &[0], true)?;
		n_cur += 1;
		ctx.decode(&mut batch).context("token evaluation failed")?;
	}

	Ok(Completion {
		content: content.trim().to_string(),
		usage: usage_for(n_generated),
	})
}

fn build_sampler(options: &GenerationOptions) -> LlamaSampler {
	if options.temperature <= 0.0 {
		return LlamaSampler::chain_simple([LlamaSampler::greedy()]);
	}
	// u32::MAX is the native library's "pick a fresh seed" sentinel
	let seed = options.seed.unwrap_or(u32::MAX);
	LlamaSampler::chain_simple([
		LlamaSampler::top_p(options.top_p, 1),
		LlamaSampler::temp(options.temperature),
		LlamaSampler::dist(seed),
	])
}
