use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::{EncodeInput, Tokenizer};

/// Padding id for XLM-RoBERTa vocabularies when the tokenizer has no `<pad>`.
const FALLBACK_PAD_ID: u32 = 1;

pub fn pad_id(tokenizer: &Tokenizer) -> u32 {
    tokenizer.token_to_id("<pad>").unwrap_or(FALLBACK_PAD_ID)
}

/// Token ids and attention masks for a batch, padded to the longest
/// sequence. Sequences longer than `max_len` are cut but keep their final
/// (end-of-sequence) token.
pub fn encode_batch<'s, E>(tokenizer: &Tokenizer, inputs: Vec<E>, max_len: usize) -> Result<(Vec<Vec<u32>>, Vec<Vec<u32>>)>
where
    E: Into<EncodeInput<'s>>,
{
    let pad = pad_id(tokenizer);
    let mut ids = Vec::with_capacity(inputs.len());
    let mut masks = Vec::with_capacity(inputs.len());
    for input in inputs {
        let enc = tokenizer.encode(input, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let mut seq = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        if seq.len() > max_len && max_len > 0 {
            let last = seq[seq.len() - 1];
            seq.truncate(max_len);
            mask.truncate(max_len);
            seq[max_len - 1] = last;
        }
        ids.push(seq);
        masks.push(mask);
    }

    let width = ids.iter().map(Vec::len).max().unwrap_or(0).max(1);
    for (seq, mask) in ids.iter_mut().zip(masks.iter_mut()) {
        seq.resize(width, pad);
        mask.resize(width, 0);
    }
    Ok((ids, masks))
}

/// `[B,T]` u32 tensors for `input_ids` and `attention_mask`.
pub fn to_tensors(ids: Vec<Vec<u32>>, masks: Vec<Vec<u32>>, device: &Device) -> Result<(Tensor, Tensor)> {
    let batch = ids.len();
    let width = ids.first().map(Vec::len).unwrap_or(0);
    let input_ids = Tensor::from_vec(ids.concat(), (batch, width), device)?;
    let attention_mask = Tensor::from_vec(masks.concat(), (batch, width), device)?;
    Ok((input_ids, attention_mask))
}
