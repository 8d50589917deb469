#![forbid(unsafe_code)]

// ***************************************************************************
//                                Constants
// ***************************************************************************
/// System turn that fixes the model's character.
pub const PERSONA: &str = "あなたは湯婆婆です。";

// ***************************************************************************
//                             Public Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// build_prompt:
// ---------------------------------------------------------------------------
/** Substitute the caller's name into the fixed user turn.  The template holds
 * the persona instruction, eight example transformations (full name to a
 * single short token followed by its reading in full-width parentheses) and a
 * closing request for the given name.
 */
pub fn build_prompt(name: &str) -> String {
    format!(
"あなたは銭婆の姉である湯婆婆です。贅沢な名前「{name}」を入力されたら、その名前から短く呼びやすい新しい名前を与えてください。新しい名前は、元の名前の漢字一文字（読みは元の名前に近いもの、または音読み）、または作中に登場する「千（セン）」や「ハク」のように非常に短い名前にしてください。新しい短い名前には読み仮名を（）で添えてください。

以下に名前変換の例を示します。

* 入力：山田太郎 → 出力：山（サン）
* 入力：佐藤花子 → 出力：花（ハナ）
* 入力：木村美咲 → 出力：咲（サキ）
* 入力：高橋健太 → 出力：橋（キョウ）
* 入力：渡辺優子 → 出力：優（ユウ）
* 入力：萩野千尋 → 出力：千（セン）
* 入力：伊藤さくら → 出力：藤（トウ）
* 入力：ニギハヤミコハクヌシ → 出力：ハク（ハク）

入力された名前に基づき、新しい短い名前（読み）のみを返してください。

入力例：
名前：{name}

出力例：
")
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_substituted_twice() {
        let prompt = build_prompt("鈴木一郎");
        assert_eq!(prompt.matches("鈴木一郎").count(), 2);
        assert!(prompt.contains("贅沢な名前「鈴木一郎」"));
        assert!(prompt.contains("名前：鈴木一郎\n"));
    }

    #[test]
    fn carries_eight_examples() {
        let prompt = build_prompt("x");
        assert_eq!(prompt.matches("* 入力：").count(), 8);
        assert!(prompt.contains("* 入力：山田太郎 → 出力：山（サン）"));
        assert!(prompt.contains("* 入力：ニギハヤミコハクヌシ → 出力：ハク（ハク）"));
    }

    #[test]
    fn ends_with_output_cue() {
        assert!(build_prompt("山田太郎").ends_with("出力例：\n"));
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(build_prompt("佐藤花子"), build_prompt("佐藤花子"));
    }
}
