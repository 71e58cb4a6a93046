//! The compiled Lua script set. These are static strings, not user-
//! modifiable at runtime — the store only ever sees this fixed, auditable
//! set (§9 "Shared state").
//!
//! Each primitive's logic lives in exactly one script; the only exception
//! is the verified-code send/rollback pair (`VERIFIED_SEND_CODE` +
//! `VERIFIED_ROLLBACK`), which is the sole two-round-trip composition the
//! toolkit performs, guarded by a `(code, lasted)` match.

/// Fixed-window counter take.
///
/// KEYS\[1\] = counter key
/// ARGV\[1\] = window seconds
/// ARGV\[2\] = quota
///
/// Returns `0` Allowed, `1` HitQuota, `2` OverQuota.
pub const PERIOD_TAKE: &str = r"
local current = redis.call('INCRBY', KEYS[1], 1)
if current == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
local quota = tonumber(ARGV[2])
if current < quota then
    return 0
elseif current == quota then
    return 1
end
return 2
";

/// Force a period counter to quota, always setting a TTL on creation.
///
/// KEYS\[1\] = counter key
/// ARGV\[1\] = window seconds
/// ARGV\[2\] = quota
pub const PERIOD_SET_QUOTA_FULL: &str = r"
local existed = redis.call('EXISTS', KEYS[1])
redis.call('SET', KEYS[1], ARGV[2])
if existed == 0 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return 1
";

/// Failure-window check: a reported success clears the window only while
/// strictly under quota; a reported failure increments and never clears.
///
/// KEYS\[1\] = counter key
/// ARGV\[1\] = `1` success / `0` failure
/// ARGV\[2\] = quota
/// ARGV\[3\] = window seconds
///
/// Returns `0` Success, `1` InQuota, `2` OverQuota.
pub const PERIOD_FAILURE_CHECK: &str = r"
local success = tonumber(ARGV[1])
local quota = tonumber(ARGV[2])
if success == 1 then
    local current = redis.call('GET', KEYS[1])
    if current == false then
        return 0
    end
    if tonumber(current) < quota then
        redis.call('DEL', KEYS[1])
        return 0
    end
    return 2
end
local current = redis.call('INCRBY', KEYS[1], 1)
if current == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[3])
end
if current <= quota then
    return 1
end
return 2
";

/// Seed or raise a failure counter to quota; always sets a TTL on creation.
///
/// KEYS\[1\] = counter key
/// ARGV\[1\] = window seconds
/// ARGV\[2\] = quota
pub const PERIOD_FAILURE_SET_QUOTA_FULL: &str = r"
local quota = tonumber(ARGV[2])
local existed = redis.call('EXISTS', KEYS[1])
if existed == 0 then
    redis.call('SET', KEYS[1], quota)
    redis.call('EXPIRE', KEYS[1], ARGV[1])
    return 1
end
local current = tonumber(redis.call('GET', KEYS[1]))
if current < quota then
    redis.call('SET', KEYS[1], quota)
end
return 1
";

/// Verified-code send: charges the per-target global bucket and writes the
/// per-(target,kind) entry, rolling back on overflow or cooldown.
///
/// KEYS\[1\] = global bucket hash key
/// KEYS\[2\] = entry hash key
/// ARGV\[1\] = `maxSendPerDay`
/// ARGV\[2\] = `codeMaxSendPerDay`
/// ARGV\[3\] = global bucket TTL seconds
/// ARGV\[4\] = code
/// ARGV\[5\] = `codeMaxErrorQuota`
/// ARGV\[6\] = now (epoch seconds, caller-supplied)
/// ARGV\[7\] = `codeResendIntervalSecond`
/// ARGV\[8\] = `codeAvailWindowSecond`
///
/// Returns `0` Success, `1` `ReachMaxSendPerDay`, `2` `ResendTooFrequently`.
pub const VERIFIED_SEND_CODE: &str = r"
local send_cnt = redis.call('HINCRBY', KEYS[1], 'sendCnt', 1)
local code_cnt = redis.call('HINCRBY', KEYS[1], 'codeCnt', 1)
if send_cnt == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[3])
end
if send_cnt > tonumber(ARGV[1]) or code_cnt > tonumber(ARGV[2]) then
    redis.call('HINCRBY', KEYS[1], 'sendCnt', -1)
    redis.call('HINCRBY', KEYS[1], 'codeCnt', -1)
    return 1
end
local lasted = redis.call('HGET', KEYS[2], 'lasted')
if lasted ~= false and (tonumber(lasted) + tonumber(ARGV[7])) > tonumber(ARGV[6]) then
    redis.call('HINCRBY', KEYS[1], 'sendCnt', -1)
    redis.call('HINCRBY', KEYS[1], 'codeCnt', -1)
    return 2
end
redis.call('HSET', KEYS[2], 'code', ARGV[4], 'quota', ARGV[5], 'err', 0, 'lasted', ARGV[6])
redis.call('EXPIRE', KEYS[2], ARGV[8])
return 0
";

/// Compensating rollback after a provider delivery failure. Race-safe: the
/// entry is only deleted if its `(code, lasted)` still match the issue this
/// send created, so a concurrent re-issue is never clobbered.
///
/// KEYS\[1\] = global bucket hash key
/// KEYS\[2\] = entry hash key
/// ARGV\[1\] = code
/// ARGV\[2\] = lasted
pub const VERIFIED_ROLLBACK: &str = r"
redis.call('HINCRBY', KEYS[1], 'sendCnt', -1)
redis.call('HINCRBY', KEYS[1], 'codeCnt', -1)
local code = redis.call('HGET', KEYS[2], 'code')
local lasted = redis.call('HGET', KEYS[2], 'lasted')
if code == ARGV[1] and lasted == ARGV[2] then
    redis.call('DEL', KEYS[2])
end
return 1
";

/// Verified-code verify: one-shot, bounded by an error budget that is
/// consulted before the stored code.
///
/// KEYS\[1\] = entry hash key
/// ARGV\[1\] = code
///
/// Returns `0` Success, `1` `RequiredOrExpired`, `2` `ReachMaxError`, `3`
/// `VerificationFailure`.
pub const VERIFIED_VERIFY_CODE: &str = r"
local exists = redis.call('EXISTS', KEYS[1])
if exists == 0 then
    return 1
end
local err_cnt = tonumber(redis.call('HGET', KEYS[1], 'err'))
local quota = tonumber(redis.call('HGET', KEYS[1], 'quota'))
if err_cnt >= quota then
    return 2
end
local stored = redis.call('HGET', KEYS[1], 'code')
if stored == ARGV[1] then
    redis.call('DEL', KEYS[1])
    return 0
end
redis.call('HINCRBY', KEYS[1], 'err', 1)
return 3
";

/// Bare global-bucket increment for flows that charge a send-attempt
/// without writing a code entry.
///
/// KEYS\[1\] = global bucket hash key
/// ARGV\[1\] = `maxSendPerDay`
/// ARGV\[2\] = global bucket TTL seconds
///
/// Returns `0` Success, `1` `ReachMaxSendPerDay`.
pub const VERIFIED_INCR: &str = r"
local send_cnt = redis.call('HINCRBY', KEYS[1], 'sendCnt', 1)
if send_cnt == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[2])
end
if send_cnt > tonumber(ARGV[1]) then
    redis.call('HINCRBY', KEYS[1], 'sendCnt', -1)
    return 1
end
return 0
";

/// Bare global-bucket decrement; deletes the key if it would drop below
/// zero (defensive: the invariant is `>= 0`).
///
/// KEYS\[1\] = global bucket hash key
pub const VERIFIED_DECR: &str = r"
local send_cnt = redis.call('HINCRBY', KEYS[1], 'sendCnt', -1)
if send_cnt < 0 then
    redis.call('DEL', KEYS[1])
end
return 0
";

/// One-time challenge match: reads-and-optionally-deletes.
///
/// KEYS\[1\] = challenge key
/// ARGV\[1\] = supplied answer
/// ARGV\[2\] = `1` to clear on read, `0` to preserve (speculative `Match`)
///
/// Returns `0` Success, `1` Failure (including "no such key").
pub const CHALLENGE_MATCH_ONE_TIME: &str = r"
local stored = redis.call('GET', KEYS[1])
if stored == false then
    return 1
end
if tonumber(ARGV[2]) == 1 then
    redis.call('DEL', KEYS[1])
end
if stored == ARGV[1] then
    return 0
end
return 1
";

/// Atomically write a bounded-retry challenge entry (`{answer, quota,
/// err:=0}`) plus its TTL in one round trip, so a concurrent verify can never
/// observe the hash with `answer` set but `quota`/`err` still missing.
///
/// KEYS\[1\] = challenge hash key
/// ARGV\[1\] = answer
/// ARGV\[2\] = quota
/// ARGV\[3\] = expires seconds
pub const CHALLENGE_WRITE_BOUNDED: &str = r"
redis.call('HSET', KEYS[1], 'answer', ARGV[1], 'quota', ARGV[2], 'err', 0)
redis.call('EXPIRE', KEYS[1], ARGV[3])
return 1
";

/// Bounded-retry challenge verify: always destructive on a terminal outcome
/// (correct match, or the error budget is exhausted).
///
/// KEYS\[1\] = challenge hash key
/// ARGV\[1\] = supplied answer
///
/// Returns `0` Success, `1` Failure.
pub const CHALLENGE_VERIFY_BOUNDED_RETRY: &str = r"
local exists = redis.call('EXISTS', KEYS[1])
if exists == 0 then
    return 1
end
local stored = redis.call('HGET', KEYS[1], 'answer')
if stored == ARGV[1] then
    redis.call('DEL', KEYS[1])
    return 0
end
local err = redis.call('HINCRBY', KEYS[1], 'err', 1)
local quota = tonumber(redis.call('HGET', KEYS[1], 'quota'))
if err >= quota then
    redis.call('DEL', KEYS[1])
end
return 1
";
